//! GatewayBuilder -- fluent builder for constructing [`Gateway`] instances.
//!
//! Separates configuration from construction so that callers can set the
//! peer address, receive windows, heartbeat timing, and notification sink
//! before the socket is bound.
//!
//! # Example
//!
//! ```no_run
//! use migw::GatewayBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> migw::Result<()> {
//! let gateway = GatewayBuilder::new()
//!     .host("192.168.1.20")
//!     .reply_timeout(Duration::from_secs(2))
//!     .on_notification(|n: migw::Notification| println!("{}: {}", n.topic(), n.payload()))
//!     .build()
//!     .await?;
//! gateway.start()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use migw_core::error::{Error, Result};
use migw_core::events::NotificationSink;
use migw_core::transport::Transport;
use migw_transport::UdpTransport;

use crate::devices::LightRing;
use crate::dispatch::Dispatcher;
use crate::gateway::Gateway;
use crate::heartbeat::{DEFAULT_PING_INTERVAL, DEFAULT_PONG_TIMEOUT, HeartbeatMonitor};
use crate::io::{IoConfig, Worker};
use crate::notifier::Notifier;
use crate::queue::{DEFAULT_QUEUE_CAPACITY, command_queue};

/// Default gateway UDP port.
pub const DEFAULT_PORT: u16 = 54321;

/// Default reply window after sending a command.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Default background receive timeout per loop iteration.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Fluent builder for [`Gateway`].
///
/// Everything but the host has a default, so the simplest usage is:
///
/// ```ignore
/// let gateway = GatewayBuilder::new().host("192.168.1.20").build().await?;
/// ```
pub struct GatewayBuilder {
    host: Option<String>,
    port: u16,
    local_addr: Option<String>,
    reply_timeout: Duration,
    poll_timeout: Duration,
    ping_interval: Duration,
    pong_timeout: Duration,
    queue_capacity: usize,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayBuilder {
    pub fn new() -> Self {
        GatewayBuilder {
            host: None,
            port: DEFAULT_PORT,
            local_addr: None,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            sink: None,
        }
    }

    /// Set the gateway host name or IP address. Required for [`build()`](Self::build).
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the gateway UDP port (default: 54321).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the local bind address (default: the wildcard address of the
    /// peer's family with an ephemeral port).
    pub fn local_addr(mut self, addr: &str) -> Self {
        self.local_addr = Some(addr.to_string());
        self
    }

    /// Set how long to wait for the reply to a sent command (default: 2s).
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Set how long each background receive waits (default: 1s).
    ///
    /// This also bounds how long [`Gateway::stop()`] takes to be observed
    /// when the queue is idle.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the interval between liveness probes (default: 200s).
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the silence after which the gateway is considered offline
    /// (default: 300s).
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Set the command queue capacity (default: 100).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Register the notification sink up front.
    ///
    /// It can be replaced later with [`Gateway::set_callback()`].
    pub fn on_notification<S>(mut self, sink: S) -> Self
    where
        S: NotificationSink + 'static,
    {
        self.sink = Some(Arc::new(sink));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(Error::InvalidParameter(
                "queue_capacity must be greater than zero".into(),
            ));
        }
        for (name, value) in [
            ("reply_timeout", self.reply_timeout),
            ("poll_timeout", self.poll_timeout),
            ("ping_interval", self.ping_interval),
            ("pong_timeout", self.pong_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::InvalidParameter(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }

    /// Build a [`Gateway`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `migw-test-harness`). The worker is not
    /// started; call [`Gateway::start()`].
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<Gateway> {
        self.validate()?;

        let (queue, commands) = command_queue(self.queue_capacity);
        let notifier = Notifier::new();
        if let Some(sink) = self.sink {
            notifier.set(sink);
        }
        let light_ring = LightRing::new(Arc::new(queue.clone()));
        let online = Arc::new(AtomicBool::new(true));

        let worker = Worker::new(
            transport,
            HeartbeatMonitor::new(self.ping_interval, self.pong_timeout),
            Dispatcher::new(notifier.clone(), light_ring.clone()),
            queue.clone(),
            commands,
            Arc::clone(&online),
            IoConfig {
                reply_timeout: self.reply_timeout,
                poll_timeout: self.poll_timeout,
            },
        );

        Ok(Gateway::new(worker, queue, notifier, online, light_ring))
    }

    /// Build a [`Gateway`] talking UDP to the configured host.
    ///
    /// Requires that [`host()`](Self::host) has been called.
    pub async fn build(self) -> Result<Gateway> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| Error::InvalidParameter("host is required for build()".into()))?;
        self.validate()?;

        let peer = UdpTransport::resolve(host, self.port).await?;
        let local = self
            .local_addr
            .as_deref()
            .unwrap_or(UdpTransport::unspecified_for(peer));
        let transport = UdpTransport::bind(local, peer).await?;
        tracing::debug!(peer = %peer, local_addr = %transport.local_addr(), "Gateway transport ready");

        self.build_with_transport(Box::new(transport)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migw_core::events::Notification;
    use migw_test_harness::{MockPeer, MockTransport};
    use serde_json::json;

    #[tokio::test]
    async fn builder_defaults() {
        let (mock, _handle) = MockTransport::new();
        let gw = GatewayBuilder::new()
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert!(!gw.is_running());
        assert!(gw.is_online());
        assert_eq!(gw.pending_commands(), 0);
    }

    #[tokio::test]
    async fn build_requires_host() {
        let result = GatewayBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn zero_capacity_rejected() {
        let (mock, _handle) = MockTransport::new();
        let result = GatewayBuilder::new()
            .queue_capacity(0)
            .build_with_transport(Box::new(mock))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn zero_timeouts_rejected() {
        let builders = [
            GatewayBuilder::new().reply_timeout(Duration::ZERO),
            GatewayBuilder::new().poll_timeout(Duration::ZERO),
            GatewayBuilder::new().ping_interval(Duration::ZERO),
            GatewayBuilder::new().pong_timeout(Duration::ZERO),
        ];
        for builder in builders {
            let (mock, _handle) = MockTransport::new();
            let err = builder
                .build_with_transport(Box::new(mock))
                .await
                .err()
                .unwrap();
            assert!(matches!(err, Error::InvalidParameter(_)), "{err}");
        }
    }

    #[tokio::test]
    async fn small_queue_applies_backpressure() {
        let (mock, _handle) = MockTransport::new();
        let gw = GatewayBuilder::new()
            .queue_capacity(1)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        gw.queue_cmd("first", None, false).await.unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            gw.queue_cmd("second", None, false),
        )
        .await;
        assert!(blocked.is_err(), "second submit should wait for space");
        assert_eq!(gw.pending_commands(), 1);
    }

    #[tokio::test]
    async fn udp_round_trip_against_mock_peer() {
        let peer = MockPeer::start().await.unwrap();
        peer.script().reply_result("internal.PING", json!("online"));
        peer.script().reply_result("get_doorbell_push", json!("on"));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let gw = GatewayBuilder::new()
            .host("127.0.0.1")
            .port(peer.addr().port())
            .reply_timeout(Duration::from_millis(500))
            .poll_timeout(Duration::from_millis(50))
            .on_notification(move |n: Notification| {
                let _ = tx.send(n);
            })
            .build()
            .await
            .unwrap();
        gw.start().unwrap();

        gw.doorbell().get_push().await.unwrap();
        let n = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n.payload(), json!({"cmd": "get_doorbell_push", "result": "on"}));

        // The probe was queued behind get_push and may still be in flight.
        for _ in 0..100 {
            if peer.received_methods().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            peer.received_methods(),
            vec!["get_doorbell_push", "internal.PING"]
        );
        assert!(gw.is_online());

        gw.shutdown().await;
    }

    #[tokio::test]
    async fn unsolicited_datagram_from_mock_peer() {
        let peer = MockPeer::start().await.unwrap();
        peer.script().reply_result("internal.PING", json!("online"));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let gw = GatewayBuilder::new()
            .host("127.0.0.1")
            .port(peer.addr().port())
            .reply_timeout(Duration::from_millis(500))
            .poll_timeout(Duration::from_millis(50))
            .on_notification(move |n: Notification| {
                let _ = tx.send(n);
            })
            .build()
            .await
            .unwrap();
        gw.start().unwrap();

        // The probe tells the peer where the client lives.
        for _ in 0..100 {
            if !peer.received().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        peer.push(b"{\"method\":\"event.click\",\"sid\":\"lumi.1\",\"model\":\"lumi.sensor_switch.v2\",\"params\":[]}\0")
            .await
            .unwrap();

        let n = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match n {
            Notification::Event(e) => {
                assert_eq!(e.event, "click");
                assert_eq!(e.device_id.as_deref(), Some("lumi.1"));
            }
            other => panic!("expected event, got {:?}", other),
        }

        gw.shutdown().await;
    }
}
