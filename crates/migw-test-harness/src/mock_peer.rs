//! Mock gateway peer on a loopback UDP socket.
//!
//! [`MockPeer`] binds a real UDP socket on `127.0.0.1` and answers requests
//! according to a [`Script`], so the real `UdpTransport` and the full
//! gateway run loop can be tested end to end without hardware.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use migw_core::error::{Error, Result};
use migw_core::types::MAX_DATAGRAM_LEN;

use crate::script::Script;

/// A scripted gateway listening on loopback.
pub struct MockPeer {
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
    script: Script,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    client: Arc<Mutex<Option<SocketAddr>>>,
    task: JoinHandle<()>,
}

impl MockPeer {
    /// Bind a random loopback port and start answering requests.
    pub async fn start() -> Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock peer: {}", e)))?;
        let addr = socket.local_addr().map_err(Error::Io)?;
        let socket = Arc::new(socket);
        let script = Script::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let client = Arc::new(Mutex::new(None));

        let task = {
            let socket = Arc::clone(&socket);
            let script = script.clone();
            let received = Arc::clone(&received);
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                serve(socket, script, received, client).await;
            })
        };

        tracing::debug!(addr = %addr, "mock peer listening");
        Ok(Self {
            socket,
            addr,
            script,
            received,
            client,
            task,
        })
    }

    /// The address the peer listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The reply script.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// All request datagrams received so far.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The `method` of every received request, oldest first.
    pub fn received_methods(&self) -> Vec<String> {
        self.received()
            .iter()
            .filter_map(|d| serde_json::from_slice::<Value>(d).ok())
            .filter_map(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    /// Send an unsolicited datagram to the most recent client.
    ///
    /// Fails with [`Error::NotConnected`] until a client has sent something.
    pub async fn push(&self, data: &[u8]) -> Result<()> {
        let client = (*self.client.lock().unwrap_or_else(|e| e.into_inner()))
            .ok_or(Error::NotConnected)?;
        self.socket.send_to(data, client).await.map_err(Error::Io)?;
        Ok(())
    }
}

impl Drop for MockPeer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: Arc<UdpSocket>,
    script: Script,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
    client: Arc<Mutex<Option<SocketAddr>>>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    loop {
        let (n, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "mock peer recv error");
                continue;
            }
        };
        let request = buf[..n].to_vec();
        *client.lock().unwrap_or_else(|e| e.into_inner()) = Some(src);
        received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        for reply in script.replies_for(&request) {
            if let Err(e) = socket.send_to(&reply, src).await {
                tracing::debug!(error = %e, "mock peer send error");
            }
        }
    }
}
