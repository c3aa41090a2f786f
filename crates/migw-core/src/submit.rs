//! The command submission capability.
//!
//! Sub-device controllers never see the gateway itself. They receive an
//! `Arc<dyn CommandSubmitter>` and can only enqueue commands through it;
//! the socket stays owned by the gateway worker.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Command;

/// Enqueue commands for the gateway worker.
#[async_trait]
pub trait CommandSubmitter: Send + Sync {
    /// Submit a command for transmission.
    ///
    /// Waits for queue space when the queue is full. Returns
    /// [`Error::QueueClosed`](crate::error::Error::QueueClosed) once the
    /// worker has gone away.
    async fn submit(&self, command: Command) -> Result<()>;
}
