//! Transport trait for gateway communication.
//!
//! The [`Transport`] trait abstracts over the datagram link to the peer.
//! The gateway worker owns exactly one transport and is the only code that
//! performs I/O on it. Implementations exist for UDP (`migw-transport`) and
//! for deterministic tests (`MockTransport` in `migw-test-harness`).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous datagram transport to a single peer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one datagram to the peer.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive one datagram into `buf`, waiting at most `timeout`.
    ///
    /// Returns the datagram length. Returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing arrives
    /// before the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is usable.
    fn is_connected(&self) -> bool;
}
