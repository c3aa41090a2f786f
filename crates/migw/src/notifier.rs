//! Delivery of notifications to the registered sink.

use std::sync::{Arc, RwLock};

use migw_core::events::{Notification, NotificationSink};

/// Shared slot holding the optional notification sink.
///
/// The gateway handle replaces the sink; the worker reads it on every
/// delivery. Without a sink, notifications are logged and dropped.
#[derive(Clone, Default)]
pub struct Notifier {
    sink: Arc<RwLock<Option<Arc<dyn NotificationSink>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink`, replacing any previous one.
    pub fn set(&self, sink: Arc<dyn NotificationSink>) {
        *self.sink.write().unwrap_or_else(|e| e.into_inner()) = Some(sink);
    }

    /// Remove the registered sink.
    pub fn clear(&self) {
        *self.sink.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn has_sink(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Deliver a notification. Returns `false` if no sink was registered.
    pub fn notify(&self, notification: Notification) -> bool {
        // Clone the sink out so it is not called under the lock.
        let sink = self
            .sink
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match sink {
            Some(sink) => {
                tracing::debug!(topic = %notification.topic(), "Delivering notification");
                sink.notify(notification);
                true
            }
            None => {
                tracing::warn!(
                    topic = %notification.topic(),
                    "No notification sink registered, dropping notification"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migw_core::events::{CommandResult, Topic};
    use serde_json::json;
    use std::sync::Mutex;

    fn result_notification() -> Notification {
        Notification::Result(CommandResult {
            cmd: "get_doorbell_push".into(),
            result: json!("on"),
        })
    }

    #[test]
    fn missing_sink_drops_quietly() {
        let notifier = Notifier::new();
        assert!(!notifier.has_sink());
        assert!(!notifier.notify(result_notification()));
    }

    #[test]
    fn registered_sink_receives() {
        let notifier = Notifier::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        notifier.set(Arc::new(move |n: Notification| {
            sink_seen.lock().unwrap().push(n.topic());
        }));

        assert!(notifier.notify(result_notification()));
        assert_eq!(*seen.lock().unwrap(), vec![Topic::Result]);
    }

    #[test]
    fn clear_removes_sink() {
        let notifier = Notifier::new();
        notifier.set(Arc::new(|_: Notification| {}));
        notifier.clear();
        assert!(!notifier.notify(result_notification()));
    }

    #[test]
    fn clones_share_the_slot() {
        let notifier = Notifier::new();
        let worker_side = notifier.clone();
        notifier.set(Arc::new(|_: Notification| {}));
        assert!(worker_side.has_sink());
    }
}
