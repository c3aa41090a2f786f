//! The gateway handle.
//!
//! [`Gateway`] is what callers hold. It owns the producer side of the
//! command queue, the notification slot, and the sub-device controllers,
//! and it controls the lifecycle of the single worker task that owns the
//! transport. Construct one with [`GatewayBuilder`](crate::GatewayBuilder).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use migw_core::error::{Error, Result};
use migw_core::events::{CommandResult, NotificationSink};
use migw_core::submit::CommandSubmitter;
use migw_core::types::Command;

use crate::devices::{Doorbell, LightRing};
use crate::io::Worker;
use crate::notifier::Notifier;
use crate::queue::CommandQueue;

/// Lifecycle of the worker task.
enum WorkerSlot {
    /// Built but not started.
    Idle(Box<Worker>),
    Running(JoinHandle<()>),
    /// Joined; the transport is closed.
    Finished,
}

/// Client for one gateway.
///
/// Commands are queued from any task; the worker started by
/// [`start()`](Self::start) sends them one at a time and routes everything
/// the gateway sends back to the registered notification sink.
///
/// A gateway runs once. After [`stop()`](Self::stop) the transport is
/// closed and a new gateway must be built.
pub struct Gateway {
    queue: CommandQueue,
    notifier: Notifier,
    online: Arc<AtomicBool>,
    doorbell: Doorbell,
    light_ring: LightRing,
    cancel: CancellationToken,
    worker: Mutex<WorkerSlot>,
}

impl Drop for Gateway {
    fn drop(&mut self) {
        // The worker exits after its current iteration.
        self.cancel.cancel();
    }
}

impl Gateway {
    pub(crate) fn new(
        worker: Worker,
        queue: CommandQueue,
        notifier: Notifier,
        online: Arc<AtomicBool>,
        light_ring: LightRing,
    ) -> Self {
        let doorbell = Doorbell::new(Arc::new(queue.clone()));
        Self {
            queue,
            notifier,
            online,
            doorbell,
            light_ring,
            cancel: CancellationToken::new(),
            worker: Mutex::new(WorkerSlot::Idle(Box::new(worker))),
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Spawn the worker on the current tokio runtime.
    ///
    /// Fails with [`Error::AlreadyRunning`] if the worker was already
    /// started, or [`Error::NotConnected`] once it has been joined.
    pub fn start(&self) -> Result<()> {
        let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        match std::mem::replace(&mut *slot, WorkerSlot::Finished) {
            WorkerSlot::Idle(worker) => {
                tracing::debug!("Starting gateway worker");
                *slot = WorkerSlot::Running(tokio::spawn(worker.run(self.cancel.clone())));
                Ok(())
            }
            running @ WorkerSlot::Running(_) => {
                *slot = running;
                Err(Error::AlreadyRunning)
            }
            WorkerSlot::Finished => Err(Error::NotConnected),
        }
    }

    /// Ask the worker to exit after its current iteration.
    ///
    /// An exchange in progress is allowed to complete. Use
    /// [`join()`](Self::join) to wait for the exit.
    pub fn stop(&self) {
        tracing::debug!("Stopping gateway worker");
        self.cancel.cancel();
    }

    /// Wait for a stopped worker to exit.
    ///
    /// Returns immediately if the worker was never started.
    pub async fn join(&self) {
        let handle = {
            let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            match std::mem::replace(&mut *slot, WorkerSlot::Finished) {
                WorkerSlot::Running(handle) => handle,
                other => {
                    *slot = other;
                    return;
                }
            }
        };

        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Gateway worker ended abnormally");
        }
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(&self) {
        self.stop();
        self.join().await;
    }

    /// Whether the worker is currently running.
    pub fn is_running(&self) -> bool {
        let slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        matches!(&*slot, WorkerSlot::Running(handle) if !handle.is_finished())
    }

    /// Whether the peer is considered online by the heartbeat monitor.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    /// Queue a command without waiting for it to be sent.
    ///
    /// Waits for space if the queue is full. A result, if expected and
    /// received, arrives as a `result` notification.
    pub async fn queue_cmd(
        &self,
        method: &str,
        params: Option<Value>,
        expect_result: bool,
    ) -> Result<()> {
        self.queue
            .submit(command(method, params, expect_result))
            .await
    }

    /// Queue a command and wait for the worker to send it.
    ///
    /// Returns the correlated result, or `None` if the command did not
    /// expect one or nothing arrived within the reply window. Fails with
    /// [`Error::NotConnected`] when the worker is not running.
    pub async fn send_cmd(
        &self,
        method: &str,
        params: Option<Value>,
        expect_result: bool,
    ) -> Result<Option<CommandResult>> {
        if !self.is_running() {
            return Err(Error::NotConnected);
        }
        let reply = self
            .queue
            .submit_with_reply(command(method, params, expect_result))
            .await?;
        // The sender is dropped unanswered only if the worker exits first.
        reply.await.map_err(|_| Error::QueueClosed)
    }

    /// Number of commands waiting to be sent.
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// The queueing capability, for controllers built outside this crate.
    pub fn submitter(&self) -> Arc<dyn CommandSubmitter> {
        Arc::new(self.queue.clone())
    }

    // -----------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------

    /// Register the notification sink, replacing any previous one.
    pub fn set_callback<S>(&self, sink: S)
    where
        S: NotificationSink + 'static,
    {
        self.notifier.set(Arc::new(sink));
    }

    /// Remove the notification sink. Notifications are then logged and dropped.
    pub fn clear_callback(&self) {
        self.notifier.clear();
    }

    // -----------------------------------------------------------------
    // Sub-devices
    // -----------------------------------------------------------------

    pub fn doorbell(&self) -> &Doorbell {
        &self.doorbell
    }

    pub fn light_ring(&self) -> &LightRing {
        &self.light_ring
    }
}

fn command(method: &str, params: Option<Value>, expect_result: bool) -> Command {
    let command = Command::new(method).expect_result(expect_result);
    match params {
        Some(params) => command.with_params(params),
        None => command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GatewayBuilder;
    use crate::devices::{LightRingState, pack_rgb};
    use migw_core::events::Notification;
    use migw_test_harness::{MockHandle, MockTransport};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn gateway() -> (Gateway, MockHandle, mpsc::UnboundedReceiver<Notification>) {
        let (transport, handle) = MockTransport::new();
        handle.script().reply_result("internal.PING", json!("online"));
        let (tx, rx) = mpsc::unbounded_channel();
        let gw = GatewayBuilder::new()
            .on_notification(move |n: Notification| {
                let _ = tx.send(n);
            })
            .build_with_transport(Box::new(transport))
            .await
            .unwrap();
        (gw, handle, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
        tokio::time::timeout(Duration::from_secs(30), rx.recv())
            .await
            .expect("no notification")
            .expect("sink dropped")
    }

    #[tokio::test(start_paused = true)]
    async fn doorbell_push_result_end_to_end() {
        let (gw, handle, mut rx) = gateway().await;
        handle
            .script()
            .reply_result("get_doorbell_push", json!("on"));

        gw.queue_cmd("get_doorbell_push", None, true).await.unwrap();
        assert_eq!(gw.pending_commands(), 1);
        gw.start().unwrap();

        assert_eq!(
            next(&mut rx).await,
            Notification::Result(CommandResult {
                cmd: "get_doorbell_push".into(),
                result: json!("on"),
            })
        );
        handle.wait_for_sent(2, Duration::from_secs(5)).await.unwrap();
        assert_eq!(handle.sent_methods(), vec!["get_doorbell_push", "internal.PING"]);
        assert_eq!(gw.pending_commands(), 0);

        gw.shutdown().await;
        assert!(!gw.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn send_cmd_returns_result() {
        let (gw, handle, _rx) = gateway().await;
        handle.script().reply_result("get_doorbell_push", json!("off"));
        gw.start().unwrap();

        let result = gw
            .send_cmd("get_doorbell_push", None, true)
            .await
            .unwrap();
        assert_eq!(result.map(|r| r.result), Some(json!("off")));

        let none = gw
            .send_cmd("set_doorbell_volume", Some(json!([5])), false)
            .await
            .unwrap();
        assert_eq!(none, None);

        gw.shutdown().await;
    }

    #[tokio::test]
    async fn send_cmd_requires_running_worker() {
        let (gw, _handle, _rx) = gateway().await;
        assert!(matches!(
            gw.send_cmd("get_doorbell_push", None, true).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_errors() {
        let (gw, _handle, _rx) = gateway().await;
        assert!(!gw.is_running());
        gw.start().unwrap();
        assert!(gw.is_running());
        assert!(matches!(gw.start(), Err(Error::AlreadyRunning)));

        gw.shutdown().await;
        assert!(!gw.is_running());
        assert!(matches!(gw.start(), Err(Error::NotConnected)));
        assert!(matches!(
            gw.queue_cmd("get_doorbell_push", None, true).await,
            Err(Error::QueueClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_keeps_gateway_online() {
        let (gw, handle, _rx) = gateway().await;
        gw.start().unwrap();

        handle.wait_for_sent(1, Duration::from_secs(5)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(gw.is_online());
        assert_eq!(handle.sent_methods(), vec!["internal.PING"]);

        gw.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn silent_gateway_goes_offline_and_recovers() {
        let (transport, handle) = MockTransport::new();
        let gw = GatewayBuilder::new()
            .build_with_transport(Box::new(transport))
            .await
            .unwrap();
        gw.start().unwrap();

        handle.wait_for_sent(1, Duration::from_secs(5)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!gw.is_online());

        handle.push_datagram(br#"{"method":"internal.PONG"}"#);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(gw.is_online());

        gw.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn doorbell_commands_reach_the_wire() {
        let (gw, handle, _rx) = gateway().await;
        gw.start().unwrap();

        gw.doorbell().set_push("on").await.unwrap();
        handle.wait_for_sent(2, Duration::from_secs(30)).await.unwrap();

        let sent = handle.sent_json();
        let push = sent
            .iter()
            .find(|v| v["method"] == "set_doorbell_push")
            .expect("set_doorbell_push not sent");
        assert_eq!(push["params"], json!("on"));
        assert!(push["id"].is_u64());

        gw.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn gateway_rgb_property_updates_light_ring() {
        let (gw, handle, mut rx) = gateway().await;
        gw.start().unwrap();
        handle.wait_for_sent(1, Duration::from_secs(5)).await.unwrap();

        let props = json!({"method": "props", "params": {"rgb": pack_rgb(0xFF8800, 30)}});
        handle.push_datagram(props.to_string().as_bytes());

        match next(&mut rx).await {
            Notification::Properties(p) => assert_eq!(p.device_model, "internal"),
            other => panic!("expected properties, got {:?}", other),
        }
        assert_eq!(
            gw.light_ring().state(),
            LightRingState {
                color: 0xFF8800,
                brightness: 30
            }
        );

        gw.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_be_replaced_and_cleared() {
        let (gw, handle, mut first) = gateway().await;
        let (tx, mut second) = mpsc::unbounded_channel();
        gw.set_callback(move |n: Notification| {
            let _ = tx.send(n);
        });
        gw.start().unwrap();
        handle.wait_for_sent(1, Duration::from_secs(5)).await.unwrap();

        handle.push_datagram(br#"{"method":"_otc.log","params":{"battery":3000}}"#);
        assert_eq!(next(&mut second).await.topic(), migw_core::events::Topic::Status);
        assert!(first.try_recv().is_err());

        gw.clear_callback();
        handle.push_datagram(br#"{"method":"_otc.log","params":{"battery":2900}}"#);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(second.try_recv().is_err());

        gw.shutdown().await;
    }

    #[tokio::test]
    async fn drop_does_not_hang() {
        let (gw, _handle, _rx) = gateway().await;
        gw.start().unwrap();
        drop(gw);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
