//! Doorbell tone and push-notification controls.

use std::sync::{Arc, Mutex};

use serde_json::json;

use migw_core::error::{Error, Result};
use migw_core::submit::CommandSubmitter;
use migw_core::types::Command;

/// Last doorbell settings sent to the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorbellSettings {
    pub sound: u32,
    pub volume: u32,
}

impl Default for DoorbellSettings {
    fn default() -> Self {
        Self {
            sound: 10,
            volume: 10,
        }
    }
}

/// Doorbell controller.
pub struct Doorbell {
    submitter: Arc<dyn CommandSubmitter>,
    settings: Mutex<DoorbellSettings>,
}

impl Doorbell {
    pub fn new(submitter: Arc<dyn CommandSubmitter>) -> Self {
        Self {
            submitter,
            settings: Mutex::new(DoorbellSettings::default()),
        }
    }

    /// The settings most recently queued.
    pub fn settings(&self) -> DoorbellSettings {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the doorbell tone and/or volume.
    ///
    /// Each value given queues its own command; `None` leaves it alone.
    pub async fn set_sound(&self, sound: Option<u32>, volume: Option<u32>) -> Result<()> {
        if let Some(sound) = sound {
            self.settings.lock().unwrap_or_else(|e| e.into_inner()).sound = sound;
            let cmd = Command::new("set_doorbell_sound")
                .with_params(json!([1, sound.to_string()]))
                .expect_result(true);
            self.submitter.submit(cmd).await?;
        }
        if let Some(volume) = volume {
            self.settings.lock().unwrap_or_else(|e| e.into_inner()).volume = volume;
            let cmd = Command::new("set_doorbell_volume").with_params(json!([volume]));
            self.submitter.submit(cmd).await?;
        }
        Ok(())
    }

    /// Enable (`"on"`) or disable (`"off"`) doorbell push notifications.
    pub async fn set_push(&self, push: &str) -> Result<()> {
        if push != "on" && push != "off" {
            tracing::error!(push = %push, "Invalid doorbell push value");
            return Err(Error::InvalidParameter(format!(
                "doorbell push must be \"on\" or \"off\", got {push:?}"
            )));
        }
        let cmd = Command::new("set_doorbell_push")
            .with_params(json!(push))
            .expect_result(true);
        self.submitter.submit(cmd).await
    }

    /// Ask the gateway for the push setting; the answer arrives as a
    /// `result` notification.
    pub async fn get_push(&self) -> Result<()> {
        self.submitter
            .submit(Command::new("get_doorbell_push").expect_result(true))
            .await
    }
}
