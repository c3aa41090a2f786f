//! Gateway light ring color and brightness.
//!
//! The gateway packs both values into one integer: brightness in the high
//! byte, 24-bit RGB color below it. The same packing is used for the
//! `set_rgb` command and for `rgb` property updates.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use migw_core::error::{Error, Result};
use migw_core::submit::CommandSubmitter;
use migw_core::types::Command;

/// Largest 24-bit RGB value.
const MAX_COLOR: u32 = 0xFF_FFFF;

/// Light ring state as last reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightRingState {
    /// 24-bit RGB color.
    pub color: u32,
    pub brightness: u8,
}

impl Default for LightRingState {
    fn default() -> Self {
        Self {
            color: MAX_COLOR,
            brightness: 54,
        }
    }
}

/// Pack a color and brightness into the gateway's `rgb` integer.
pub fn pack_rgb(color: u32, brightness: u8) -> u64 {
    (u64::from(brightness) << 24) + u64::from(color & MAX_COLOR)
}

/// Split the gateway's `rgb` integer into `(color, brightness)`.
pub fn unpack_rgb(value: u64) -> (u32, u8) {
    let brightness = u8::try_from(value >> 24).unwrap_or(u8::MAX);
    let color = (value & u64::from(MAX_COLOR)) as u32;
    (color, brightness)
}

/// Parse a hex color such as `"ff8800"`, `"#ff8800"` or `"0xff8800"`.
pub fn parse_color(s: &str) -> Result<u32> {
    let hex = s
        .strip_prefix('#')
        .or_else(|| s.strip_prefix("0x"))
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let color = u32::from_str_radix(hex, 16)
        .map_err(|e| Error::InvalidParameter(format!("invalid color {s:?}: {e}")))?;
    if color > MAX_COLOR {
        return Err(Error::InvalidParameter(format!(
            "color {s:?} exceeds 24 bits"
        )));
    }
    Ok(color)
}

/// Light ring controller.
///
/// Cloning shares the state, so the worker's property hook and the
/// application see the same values.
#[derive(Clone)]
pub struct LightRing {
    submitter: Arc<dyn CommandSubmitter>,
    state: Arc<Mutex<LightRingState>>,
}

impl LightRing {
    pub fn new(submitter: Arc<dyn CommandSubmitter>) -> Self {
        Self {
            submitter,
            state: Arc::new(Mutex::new(LightRingState::default())),
        }
    }

    /// The state last reported by the gateway.
    pub fn state(&self) -> LightRingState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the color, keeping the current brightness.
    pub async fn set_color(&self, color: u32) -> Result<()> {
        let brightness = self.state().brightness;
        self.set_all(color, brightness).await
    }

    /// Change the brightness, keeping the current color.
    pub async fn set_brightness(&self, brightness: u8) -> Result<()> {
        let color = self.state().color;
        self.set_all(color, brightness).await
    }

    /// Queue a `set_rgb` command for the given color and brightness.
    ///
    /// Local state is not touched; it follows the gateway's `rgb`
    /// property report.
    pub async fn set_all(&self, color: u32, brightness: u8) -> Result<()> {
        if color > MAX_COLOR {
            return Err(Error::InvalidParameter(format!(
                "color 0x{color:X} exceeds 24 bits"
            )));
        }
        let cmd = Command::new("set_rgb")
            .with_params(json!(pack_rgb(color, brightness)))
            .expect_result(true);
        self.submitter.submit(cmd).await
    }

    /// Property-update hook: absorb an `rgb` value from a `props` message.
    pub fn handle_props(&self, props: &Value) {
        let Some(rgb) = props.get("rgb") else {
            return;
        };
        let Some(value) = rgb.as_u64() else {
            tracing::debug!(rgb = %rgb, "Ignoring non-integer rgb property");
            return;
        };

        let (color, brightness) = unpack_rgb(value);
        tracing::debug!(
            color = format!("{color:06X}"),
            brightness,
            "Light ring state updated"
        );
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = LightRingState { color, brightness };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::test_support::RecordingSubmitter;

    #[test]
    fn pack_and_unpack() {
        assert_eq!(pack_rgb(0xFF8800, 54), (54 << 24) + 0xFF8800);
        assert_eq!(unpack_rgb((54 << 24) + 0xFF8800), (0xFF8800, 54));
        assert_eq!(unpack_rgb(0), (0, 0));
    }

    #[test]
    fn unpack_saturates_oversized_brightness() {
        assert_eq!(unpack_rgb(0x1_0000_0000 + 0x00_00FF), (0xFF, u8::MAX));
    }

    #[test]
    fn parse_color_forms() {
        assert_eq!(parse_color("ff8800").unwrap(), 0xFF8800);
        assert_eq!(parse_color("#FF8800").unwrap(), 0xFF8800);
        assert_eq!(parse_color("0x0000ff").unwrap(), 0xFF);
        assert!(matches!(
            parse_color("1000000"),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(parse_color("zz"), Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn set_all_queues_packed_value() {
        let rec = RecordingSubmitter::new();
        let ring = LightRing::new(rec.clone());

        ring.set_all(0x00FF00, 100).await.unwrap();

        let cmds = rec.taken();
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].method, "set_rgb");
        assert_eq!(cmds[0].params, Some(json!((100u64 << 24) + 0x00FF00)));
        assert!(cmds[0].expect_result);
    }

    #[tokio::test]
    async fn set_color_keeps_brightness() {
        let rec = RecordingSubmitter::new();
        let ring = LightRing::new(rec.clone());

        ring.set_color(0x123456).await.unwrap();
        assert_eq!(rec.taken()[0].params, Some(json!(pack_rgb(0x123456, 54))));

        ring.set_brightness(10).await.unwrap();
        assert_eq!(rec.taken()[0].params, Some(json!(pack_rgb(0xFFFFFF, 10))));
    }

    #[tokio::test]
    async fn set_all_rejects_wide_color() {
        let rec = RecordingSubmitter::new();
        let ring = LightRing::new(rec.clone());
        assert!(ring.set_all(0x1000000, 1).await.is_err());
        assert!(rec.taken().is_empty());
    }

    #[test]
    fn handle_props_updates_state() {
        let ring = LightRing::new(RecordingSubmitter::new());
        ring.handle_props(&json!({"rgb": pack_rgb(0xABCDEF, 20)}));
        assert_eq!(
            ring.state(),
            LightRingState {
                color: 0xABCDEF,
                brightness: 20
            }
        );
    }

    #[test]
    fn handle_props_ignores_other_keys() {
        let ring = LightRing::new(RecordingSubmitter::new());
        ring.handle_props(&json!({"illumination": 300}));
        ring.handle_props(&json!({"rgb": "bright"}));
        assert_eq!(ring.state(), LightRingState::default());
    }

    #[test]
    fn clones_share_state() {
        let ring = LightRing::new(RecordingSubmitter::new());
        let worker_side = ring.clone();
        worker_side.handle_props(&json!({"rgb": pack_rgb(0x000001, 1)}));
        assert_eq!(ring.state().color, 1);
    }
}
