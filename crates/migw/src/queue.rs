//! Bounded FIFO of commands waiting for the gateway worker.
//!
//! Any number of producers submit through cloned [`CommandQueue`]s; the
//! worker is the single consumer and drains with [`CommandReceiver::try_next`].
//! Producers wait for space when the queue is full.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use migw_core::error::{Error, Result};
use migw_core::events::CommandResult;
use migw_core::submit::CommandSubmitter;
use migw_core::types::Command;

/// Default queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// One-shot channel carrying a command's correlated result back to a caller.
pub(crate) type ReplySender = oneshot::Sender<Option<CommandResult>>;

/// A command plus an optional waiter for its result.
pub(crate) struct QueuedCommand {
    pub command: Command,
    pub reply: Option<ReplySender>,
}

/// Producer side of the command queue.
#[derive(Clone, Debug)]
pub struct CommandQueue {
    tx: mpsc::Sender<QueuedCommand>,
}

/// Consumer side of the command queue, owned by the worker.
pub(crate) struct CommandReceiver {
    rx: mpsc::Receiver<QueuedCommand>,
}

impl std::fmt::Debug for QueuedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedCommand")
            .field("command", &self.command)
            .field("awaited", &self.reply.is_some())
            .finish()
    }
}

/// Create a queue holding at most `capacity` commands.
pub(crate) fn command_queue(capacity: usize) -> (CommandQueue, CommandReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (CommandQueue { tx }, CommandReceiver { rx })
}

impl CommandQueue {
    /// Enqueue a command, waiting for space if the queue is full.
    pub async fn submit(&self, command: Command) -> Result<()> {
        self.tx
            .send(QueuedCommand {
                command,
                reply: None,
            })
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// Enqueue a command whose result the caller will await.
    pub(crate) async fn submit_with_reply(
        &self,
        command: Command,
    ) -> Result<oneshot::Receiver<Option<CommandResult>>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(QueuedCommand {
                command,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| Error::QueueClosed)?;
        Ok(reply_rx)
    }

    /// Enqueue without waiting. Fails with [`Error::QueueFull`] when full.
    pub fn try_submit(&self, command: Command) -> Result<()> {
        self.tx
            .try_send(QueuedCommand {
                command,
                reply: None,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Error::QueueFull,
                mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
            })
    }

    /// Number of commands currently waiting.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl CommandSubmitter for CommandQueue {
    async fn submit(&self, command: Command) -> Result<()> {
        CommandQueue::submit(self, command).await
    }
}

impl CommandReceiver {
    /// Pop the oldest waiting command, if any.
    pub fn try_next(&mut self) -> Option<QueuedCommand> {
        self.rx.try_recv().ok()
    }
}
