//! The gateway worker and its run loop.
//!
//! A single spawned task owns the transport and performs all I/O. Each
//! iteration of the loop:
//!
//! 1. queues a liveness probe if one is due,
//! 2. drains the command queue through the correlator,
//! 3. polls once for unsolicited traffic,
//! 4. checks the peer for staleness.
//!
//! Stopping is cooperative: the cancellation token is only observed at the
//! top of an iteration, so an exchange in progress always completes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use migw_core::error::Error;
use migw_core::transport::Transport;
use migw_core::types::{Command, MAX_DATAGRAM_LEN, ONLINE_STATUS};

use crate::codec::{FrameCodec, decode};
use crate::dispatch::{Dispatcher, Disposition};
use crate::heartbeat::HeartbeatMonitor;
use crate::queue::{CommandQueue, CommandReceiver, QueuedCommand};

/// Timing of the worker's receive windows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IoConfig {
    /// How long to wait for the reply to a just-sent command.
    pub reply_timeout: Duration,
    /// How long the background receive waits per iteration.
    pub poll_timeout: Duration,
}

/// State owned by the worker task.
pub(crate) struct Worker {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) codec: FrameCodec,
    pub(crate) heartbeat: HeartbeatMonitor,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) config: IoConfig,
    pub(crate) buf: Vec<u8>,
    queue: CommandQueue,
    commands: CommandReceiver,
    online: Arc<AtomicBool>,
}

impl Worker {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        heartbeat: HeartbeatMonitor,
        dispatcher: Dispatcher,
        queue: CommandQueue,
        commands: CommandReceiver,
        online: Arc<AtomicBool>,
        config: IoConfig,
    ) -> Self {
        online.store(heartbeat.is_online(), Ordering::Relaxed);
        Self {
            transport,
            codec: FrameCodec::new(),
            heartbeat,
            dispatcher,
            config,
            buf: vec![0u8; MAX_DATAGRAM_LEN],
            queue,
            commands,
            online,
        }
    }

    /// Run until `cancel` fires, then close the transport.
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!("Gateway worker started");

        while !cancel.is_cancelled() {
            self.run_once().await;
        }

        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "Error closing transport");
        }
        tracing::debug!("Gateway worker stopped");
    }

    /// One iteration of the run loop.
    pub(crate) async fn run_once(&mut self) {
        self.maybe_probe(Instant::now());
        self.drain_queue().await;
        self.poll_inbound().await;
        self.check_liveness(Instant::now());
    }

    fn maybe_probe(&mut self, now: Instant) {
        if !self.heartbeat.probe_due(now) {
            return;
        }
        // The worker is the queue's only consumer, so it must never wait
        // for space here. A full queue just retries next iteration.
        match self.queue.try_submit(Command::probe()) {
            Ok(()) => self.heartbeat.mark_probe_sent(now),
            Err(e) => tracing::warn!(error = %e, "Could not queue heartbeat probe"),
        }
    }

    async fn drain_queue(&mut self) {
        while let Some(QueuedCommand { command, reply }) = self.commands.try_next() {
            let result = self.send_and_wait(&command).await;

            if command.is_probe()
                && result
                    .as_ref()
                    .is_some_and(|r| r.result.as_str() == Some(ONLINE_STATUS))
            {
                self.on_pong();
            }

            if let Some(reply) = reply {
                // The caller may have given up waiting.
                let _ = reply.send(result);
            }
        }
    }

    async fn poll_inbound(&mut self) {
        match self
            .transport
            .receive(&mut self.buf, self.config.poll_timeout)
            .await
        {
            Ok(n) => {
                tracing::trace!(bytes = n, "Received datagram");
                let messages = decode(&self.buf[..n]);
                for msg in messages {
                    self.handle_message(msg);
                }
            }
            Err(Error::Timeout) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Receive failed");
                // Keep a broken transport from spinning the loop.
                tokio::time::sleep(self.config.poll_timeout).await;
            }
        }
    }

    fn check_liveness(&mut self, now: Instant) {
        self.heartbeat.check_liveness(now);
        self.publish_state();
    }

    /// Route one message that is not the answer to a pending command.
    pub(crate) fn handle_message(&mut self, msg: Value) {
        if self.dispatcher.dispatch(msg) == Disposition::Pong {
            self.on_pong();
        }
    }

    fn on_pong(&mut self) {
        self.heartbeat.record_pong(Instant::now());
        self.publish_state();
    }

    fn publish_state(&self) {
        self.online
            .store(self.heartbeat.is_online(), Ordering::Relaxed);
    }
}
