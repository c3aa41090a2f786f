//! Mock transport for deterministic testing of the gateway engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait entirely in memory.
//! Because the gateway worker takes ownership of its transport, every mock
//! comes with a cloneable [`MockHandle`] through which a test scripts
//! replies, injects unsolicited datagrams, and inspects what was sent.
//!
//! # Example
//!
//! ```
//! use migw_test_harness::MockTransport;
//! use serde_json::json;
//!
//! let (transport, handle) = MockTransport::new();
//! // Answer `get_doorbell_push` with `{"id": <id>, "result": ["on"]}`.
//! handle.script().reply_result("get_doorbell_push", json!("on"));
//! // Deliver an unsolicited event on the next receive.
//! handle.push_datagram(br#"{"method":"event.keepalive"}"#);
//! ```

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use migw_core::error::{Error, Result};
use migw_core::transport::Transport;

use crate::script::Script;

/// State shared between a [`MockTransport`] and its [`MockHandle`]s.
struct Shared {
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    sent: Mutex<Vec<Vec<u8>>>,
    sent_notify: Notify,
    script: Script,
}

/// An in-memory [`Transport`] for testing without a network.
///
/// Each `send()` is recorded and matched against the [`Script`]; scripted
/// replies become available to the next `receive()` calls. `receive()`
/// waits up to its timeout for a datagram and otherwise returns
/// [`Error::Timeout`].
pub struct MockTransport {
    inbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    shared: Arc<Shared>,
    connected: bool,
}

/// Test-side control of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a connected mock transport and its control handle.
    pub fn new() -> (Self, MockHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inbound_tx,
            sent: Mutex::new(Vec::new()),
            sent_notify: Notify::new(),
            script: Script::new(),
        });
        let handle = MockHandle {
            shared: Arc::clone(&shared),
        };
        (
            MockTransport {
                inbound_rx,
                shared,
                connected: true,
            },
            handle,
        )
    }
}

impl MockHandle {
    /// The reply script consulted on every send.
    pub fn script(&self) -> &Script {
        &self.shared.script
    }

    /// Queue a datagram for delivery on a future `receive()`.
    pub fn push_datagram(&self, data: &[u8]) {
        // The receiver lives in the transport; if it is gone nobody listens.
        let _ = self.shared.inbound_tx.send(data.to_vec());
    }

    /// All datagrams sent so far, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// All sent datagrams parsed as JSON. Unparseable ones are skipped.
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent()
            .iter()
            .filter_map(|d| serde_json::from_slice(d).ok())
            .collect()
    }

    /// The `method` of every sent datagram, oldest first.
    pub fn sent_methods(&self) -> Vec<String> {
        self.sent_json()
            .iter()
            .filter_map(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Wait until at least `count` datagrams have been sent.
    ///
    /// Returns [`Error::Timeout`] if that does not happen within `timeout`.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                let notified = self.shared.sent_notify.notified();
                if self.sent().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::Timeout)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        for reply in self.shared.script.replies_for(data) {
            let _ = self.shared.inbound_tx.send(reply);
        }

        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(data.to_vec());
        self.shared.sent_notify.notify_waiters();
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        match tokio::time::timeout(timeout, self.inbound_rx.recv()).await {
            Ok(Some(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Ok(None) => Err(Error::NotConnected),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
