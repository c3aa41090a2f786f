//! Inbound message classification.
//!
//! Every inbound message is routed by its `method` string. The mapping is
//! computed once into a [`MessageKind`] so routing stays exhaustive and can
//! be tested without any I/O.
//!
//! | method                               | kind            |
//! |--------------------------------------|-----------------|
//! | `event.keepalive`                    | `Keepalive`     |
//! | `local.*`                            | `Local`         |
//! | `_sync.*`                            | `Sync`          |
//! | `_async.*`                           | `Async`         |
//! | `props`                              | `Properties`    |
//! | `_otc.*`                             | `Status`        |
//! | `internal.PONG`, `event.heartbeat`   | `Heartbeat`     |
//! | `event.*` (other)                    | `DeviceEvent`   |
//! | anything else                        | `Unknown`       |

use serde_json::Value;

/// Category of an inbound message, derived from its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Periodic keepalive from the gateway.
    Keepalive,
    /// Local time/status queries (`local.query_time`, `local.status`, ...).
    Local,
    /// Cloud sync traffic (`_sync.getUserSceneInfo`, `_sync.neighborDevInfo`, ...).
    Sync,
    /// Asynchronous store traffic (`_async.store`).
    Async,
    /// Property update.
    Properties,
    /// Device status report (`_otc.log`).
    Status,
    /// Heartbeat answer.
    Heartbeat,
    /// Sub-device event.
    DeviceEvent,
    /// Anything not recognized.
    Unknown,
}

impl MessageKind {
    /// Classify a method name.
    pub fn from_method(method: &str) -> Self {
        match method {
            "event.keepalive" => MessageKind::Keepalive,
            "props" => MessageKind::Properties,
            "internal.PONG" | "event.heartbeat" => MessageKind::Heartbeat,
            m if m.starts_with("local.") => MessageKind::Local,
            m if m.starts_with("_sync.") => MessageKind::Sync,
            m if m.starts_with("_async.") => MessageKind::Async,
            m if m.starts_with("_otc.") => MessageKind::Status,
            m if m.starts_with("event.") => MessageKind::DeviceEvent,
            _ => MessageKind::Unknown,
        }
    }

    /// Whether messages of this kind are dropped without any action.
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            MessageKind::Keepalive | MessageKind::Local | MessageKind::Sync | MessageKind::Async
        )
    }
}

/// The `method` of an inbound message, if it has a string one.
pub fn method_of(msg: &Value) -> Option<&str> {
    msg.get("method").and_then(Value::as_str)
}

/// Classify an inbound message. `None` means it carries no method.
pub fn classify(msg: &Value) -> Option<MessageKind> {
    method_of(msg).map(MessageKind::from_method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keepalive_is_ignored() {
        let kind = MessageKind::from_method("event.keepalive");
        assert_eq!(kind, MessageKind::Keepalive);
        assert!(kind.is_ignored());
    }

    #[test]
    fn prefixed_noise_is_ignored() {
        for (method, kind) in [
            ("local.query_time", MessageKind::Local),
            ("local.status", MessageKind::Local),
            ("_sync.getUserSceneInfo", MessageKind::Sync),
            ("_sync.neighborDevInfo", MessageKind::Sync),
            ("_async.store", MessageKind::Async),
        ] {
            assert_eq!(MessageKind::from_method(method), kind, "{}", method);
            assert!(kind.is_ignored());
        }
    }

    #[test]
    fn props_and_status() {
        assert_eq!(MessageKind::from_method("props"), MessageKind::Properties);
        assert_eq!(MessageKind::from_method("_otc.log"), MessageKind::Status);
        assert!(!MessageKind::Properties.is_ignored());
        assert!(!MessageKind::Status.is_ignored());
    }

    #[test]
    fn heartbeat_methods() {
        assert_eq!(
            MessageKind::from_method("internal.PONG"),
            MessageKind::Heartbeat
        );
        assert_eq!(
            MessageKind::from_method("event.heartbeat"),
            MessageKind::Heartbeat
        );
    }

    #[test]
    fn other_events_are_device_events() {
        assert_eq!(
            MessageKind::from_method("event.motion"),
            MessageKind::DeviceEvent
        );
        assert_eq!(
            MessageKind::from_method("event.click.double"),
            MessageKind::DeviceEvent
        );
    }

    #[test]
    fn prefixes_need_the_dot() {
        assert_eq!(MessageKind::from_method("props2"), MessageKind::Unknown);
        assert_eq!(MessageKind::from_method("events"), MessageKind::Unknown);
        assert_eq!(MessageKind::from_method("localtime"), MessageKind::Unknown);
        assert_eq!(MessageKind::from_method(""), MessageKind::Unknown);
    }

    #[test]
    fn classify_reads_method_field() {
        assert_eq!(
            classify(&json!({"method": "props", "params": {}})),
            Some(MessageKind::Properties)
        );
        assert_eq!(classify(&json!({"id": 1, "result": ["ok"]})), None);
        assert_eq!(classify(&json!({"method": 5})), None);
        assert_eq!(classify(&json!([1, 2])), None);
    }
}
