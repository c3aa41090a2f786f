//! Notifications delivered to the external sink.
//!
//! Classified device traffic is normalized into a [`Notification`] and
//! handed to a single registered [`NotificationSink`]. Notifications are
//! ephemeral: the gateway keeps no copy after delivery.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Notification topic, as seen by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// An unsolicited device event (`event.*`).
    Event,
    /// A property update (`props`).
    Properties,
    /// A device status report (`_otc.*`).
    Status,
    /// The correlated result of a command.
    Result,
}

impl Topic {
    /// The wire-level topic name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Event => "event",
            Topic::Properties => "properties",
            Topic::Status => "status",
            Topic::Result => "result",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device event such as a button press or motion report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEvent {
    /// Event name with the leading `event.` segment removed.
    pub event: String,
    /// Sub-device identifier (`sid`).
    pub device_id: Option<String>,
    /// Sub-device model.
    pub device_model: Option<String>,
    /// Raw event parameters.
    pub params: Value,
}

/// A property update for the gateway or one of its sub-devices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyUpdate {
    pub device_id: Option<String>,
    /// `"internal"` when the message carried no model.
    pub device_model: String,
    pub props: Value,
}

/// A device status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub device_id: Option<String>,
    /// `"internal"` when the message carried no model.
    pub device_model: String,
    pub status: Value,
}

/// The answer to a command sent with `expect_result`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    /// Method of the originating command.
    pub cmd: String,
    /// First element of the reply's `result` array.
    pub result: Value,
}

/// A normalized notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Event(DeviceEvent),
    Properties(PropertyUpdate),
    Status(StatusUpdate),
    Result(CommandResult),
}

impl Notification {
    /// The topic this notification is delivered under.
    pub fn topic(&self) -> Topic {
        match self {
            Notification::Event(_) => Topic::Event,
            Notification::Properties(_) => Topic::Properties,
            Notification::Status(_) => Topic::Status,
            Notification::Result(_) => Topic::Result,
        }
    }

    /// The notification payload as a JSON object.
    pub fn payload(&self) -> Value {
        let value = match self {
            Notification::Event(e) => serde_json::to_value(e),
            Notification::Properties(p) => serde_json::to_value(p),
            Notification::Status(s) => serde_json::to_value(s),
            Notification::Result(r) => serde_json::to_value(r),
        };
        // Plain structs of strings and JSON values always serialize.
        value.unwrap_or(Value::Null)
    }
}

/// Receiver of gateway notifications.
///
/// Implementations must return quickly; they run on the gateway worker.
/// Any `Fn(Notification) + Send + Sync` closure is a sink.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}
