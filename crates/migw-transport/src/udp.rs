//! UDP transport for gateway communication.
//!
//! [`UdpTransport`] wraps a [`tokio::net::UdpSocket`] and a fixed peer
//! address. Every send goes to the peer; receives accept datagrams from any
//! source because gateways may answer from a different source port than
//! the one they listen on.

use async_trait::async_trait;
use migw_core::error::{Error, Result};
use migw_core::transport::Transport;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP transport to a single gateway.
#[derive(Debug)]
pub struct UdpTransport {
    /// The underlying UDP socket; `None` once closed.
    socket: Option<UdpSocket>,
    /// The local address the socket is bound to.
    local_addr: SocketAddr,
    /// The gateway address all datagrams are sent to.
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind to a local address and target `peer`.
    ///
    /// Use `"0.0.0.0:0"` to bind to any available port on all interfaces.
    pub async fn bind(addr: &str, peer: SocketAddr) -> Result<Self> {
        tracing::debug!(addr = %addr, peer = %peer, "Binding UDP socket");

        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            tracing::error!(addr = %addr, error = %e, "Failed to bind UDP socket");
            Error::Io(e)
        })?;

        let local_addr = socket.local_addr().map_err(|e| {
            tracing::error!(error = %e, "Failed to get local address");
            Error::Io(e)
        })?;

        tracing::debug!(local_addr = %local_addr, peer = %peer, "UDP socket bound");

        Ok(Self {
            socket: Some(socket),
            local_addr,
            peer,
        })
    }

    /// Resolve `host:port` to the first matching socket address.
    pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
        let target = format!("{host}:{port}");
        tokio::net::lookup_host(&target)
            .await
            .map_err(|e| Error::Transport(format!("failed to resolve {target}: {e}")))?
            .next()
            .ok_or_else(|| Error::Transport(format!("no address found for {target}")))
    }

    /// Resolve `host:port` and bind an ephemeral local port for it.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let peer = Self::resolve(host, port).await?;
        Self::bind(Self::unspecified_for(peer), peer).await
    }

    /// The wildcard bind address matching the peer's address family.
    pub fn unspecified_for(peer: SocketAddr) -> &'static str {
        if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" }
    }

    /// Get the local address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the peer address datagrams are sent to.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or(Error::NotConnected)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let socket = self.socket()?;
        tracing::trace!(
            local = %self.local_addr,
            remote = %self.peer,
            bytes = data.len(),
            "Sending datagram"
        );

        socket.send_to(data, self.peer).await.map_err(|e| {
            tracing::error!(
                local = %self.local_addr,
                remote = %self.peer,
                error = %e,
                "Failed to send datagram"
            );
            Error::Io(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let socket = self.socket()?;
        let result = tokio::time::timeout(timeout, socket.recv_from(buf)).await;

        match result {
            Ok(Ok((n, src))) => {
                tracing::trace!(
                    local = %self.local_addr,
                    remote = %src,
                    bytes = n,
                    "Received datagram"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(
                    local = %self.local_addr,
                    error = %e,
                    "Failed to receive datagram"
                );
                Err(Error::Io(e))
            }
            Err(_) => {
                tracing::trace!(
                    local = %self.local_addr,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for datagram"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.socket.take().is_some() {
            tracing::debug!(local = %self.local_addr, "UDP socket closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}
