//! Request/reply correlation.
//!
//! After sending a command the worker listens for exactly one datagram
//! within the reply window. Replies carry the request id but are matched
//! only by the presence of a `result` field. Every result-bearing message
//! in that datagram is reported as a `result` notification; the first one
//! is returned to the caller. Everything else is routed as unrelated
//! traffic.

use serde_json::Value;

use migw_core::error::Error;
use migw_core::events::{CommandResult, Notification};
use migw_core::types::Command;

use crate::codec::decode;
use crate::io::Worker;

impl Worker {
    /// Send `command` and wait one reply window for its answer.
    ///
    /// Returns `None` when the command did not expect a result, when no
    /// result arrived in time, or when sending failed. None of these are
    /// errors to the run loop.
    pub(crate) async fn send_and_wait(&mut self, command: &Command) -> Option<CommandResult> {
        tracing::debug!(method = %command.method, params = ?command.params, "Sending command");

        let frame = match self.codec.encode(command) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(method = %command.method, error = %e, "Dropping command");
                return None;
            }
        };

        if let Err(e) = self.transport.send(&frame).await {
            tracing::warn!(method = %command.method, error = %e, "Send failed");
            return None;
        }
        tracing::trace!(bytes = frame.len(), "Sent datagram");

        let n = match self
            .transport
            .receive(&mut self.buf, self.config.reply_timeout)
            .await
        {
            Ok(n) => n,
            Err(Error::Timeout) => {
                tracing::warn!(method = %command.method, "No reply for command");
                return None;
            }
            Err(e) => {
                tracing::warn!(method = %command.method, error = %e, "Receive failed");
                return None;
            }
        };
        tracing::trace!(bytes = n, "Received datagram");

        let messages = decode(&self.buf[..n]);
        let mut answer = None;
        for mut msg in messages {
            let result = match msg.get_mut("result") {
                Some(result) if command.expect_result => Some(result.take()),
                _ => None,
            };
            let Some(result) = result else {
                self.handle_message(msg);
                continue;
            };

            tracing::debug!(method = %command.method, "Got result for command");
            let result = CommandResult {
                cmd: command.method.clone(),
                result: first_result(result),
            };
            if !command.is_probe() {
                self.dispatcher
                    .notifier()
                    .notify(Notification::Result(result.clone()));
            }
            answer.get_or_insert(result);
        }
        answer
    }
}

/// The answer carried by a `result` field: the first element of an array,
/// `null` for an empty array, anything else as is.
fn first_result(result: Value) -> Value {
    match result {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}
