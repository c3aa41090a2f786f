//! Routing of inbound messages to notifications.
//!
//! The [`Dispatcher`] turns each decoded message into at most one
//! [`Notification`], feeds light ring properties to the [`LightRing`]
//! hook, and reports heartbeats back to the caller as
//! [`Disposition::Pong`]. It performs no I/O.

use serde_json::Value;

use migw_core::events::{DeviceEvent, Notification, PropertyUpdate, StatusUpdate, Topic};
use migw_core::types::{GATEWAY_MODEL, INTERNAL_MODEL};

use crate::classify::{MessageKind, method_of};
use crate::devices::LightRing;
use crate::notifier::Notifier;

/// What happened to a dispatched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Dropped on purpose (keepalive, `local.*`, `_sync.*`, `_async.*`).
    Ignored(MessageKind),
    /// A heartbeat; the caller updates liveness.
    Pong,
    /// A notification was built and handed to the notifier.
    Notified(Topic),
    /// A `device_log` property update, dropped without notification.
    DeviceLog,
    /// A `result` nobody was waiting for.
    StrayReply,
    /// No method to route on.
    NoMethod,
    /// Method not recognized.
    Unknown(String),
}

/// Routes inbound messages.
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Notifier,
    light_ring: LightRing,
}

impl Dispatcher {
    pub fn new(notifier: Notifier, light_ring: LightRing) -> Self {
        Self {
            notifier,
            light_ring,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Route one message.
    pub fn dispatch(&self, mut msg: Value) -> Disposition {
        let Some(method) = method_of(&msg).map(str::to_string) else {
            if msg.get("result").is_some() {
                tracing::debug!(msg = %msg, "Reply with no command awaiting it");
                return Disposition::StrayReply;
            }
            tracing::warn!(msg = %msg, "Message with no method");
            return Disposition::NoMethod;
        };

        // Replies are matched by the presence of `result`, never by id.
        if let Some(id) = msg.as_object_mut().and_then(|o| o.remove("id")) {
            tracing::trace!(id = %id, method = %method, "Inbound message id");
        }
        tracing::debug!(msg = %msg, "Inbound message");

        match MessageKind::from_method(&method) {
            kind @ (MessageKind::Keepalive
            | MessageKind::Local
            | MessageKind::Sync
            | MessageKind::Async) => Disposition::Ignored(kind),
            MessageKind::Properties => self.on_properties(msg),
            MessageKind::Status => self.on_status(msg),
            MessageKind::Heartbeat => Disposition::Pong,
            MessageKind::DeviceEvent => self.on_event(&method, msg),
            MessageKind::Unknown => {
                tracing::warn!(method = %method, "Unknown event received");
                Disposition::Unknown(method)
            }
        }
    }

    fn on_properties(&self, mut msg: Value) -> Disposition {
        let update = PropertyUpdate {
            device_id: string_field(&msg, "sid"),
            device_model: string_field(&msg, "model").unwrap_or_else(|| INTERNAL_MODEL.into()),
            props: take_params(&mut msg),
        };

        if is_gateway_model(&update.device_model) && update.props.get("rgb").is_some() {
            self.light_ring.handle_props(&update.props);
        }

        if update.props.get("device_log").is_some() {
            tracing::trace!(model = %update.device_model, "Discarding device_log properties");
            return Disposition::DeviceLog;
        }

        tracing::debug!(model = %update.device_model, "Callback for properties");
        self.notifier.notify(Notification::Properties(update));
        Disposition::Notified(Topic::Properties)
    }

    fn on_status(&self, mut msg: Value) -> Disposition {
        let update = StatusUpdate {
            device_id: string_field(&msg, "sid"),
            device_model: string_field(&msg, "model").unwrap_or_else(|| INTERNAL_MODEL.into()),
            status: take_params(&mut msg),
        };

        tracing::debug!(model = %update.device_model, "Callback for status");
        self.notifier.notify(Notification::Status(update));
        Disposition::Notified(Topic::Status)
    }

    fn on_event(&self, method: &str, mut msg: Value) -> Disposition {
        let event = method
            .split_once('.')
            .map(|(_, name)| name)
            .unwrap_or(method)
            .to_string();
        let device_event = DeviceEvent {
            device_id: string_field(&msg, "sid"),
            device_model: string_field(&msg, "model"),
            params: take_params(&mut msg),
            event,
        };

        tracing::debug!(event = %device_event.event, "Callback for event");
        self.notifier.notify(Notification::Event(device_event));
        Disposition::Notified(Topic::Event)
    }
}

fn is_gateway_model(model: &str) -> bool {
    model == INTERNAL_MODEL || model == GATEWAY_MODEL
}

/// A field as a string; non-string scalars are rendered as JSON.
fn string_field(msg: &Value, key: &str) -> Option<String> {
    match msg.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn take_params(msg: &mut Value) -> Value {
    msg.get_mut("params").map(Value::take).unwrap_or(Value::Null)
}
