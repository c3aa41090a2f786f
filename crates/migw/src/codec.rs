//! Gateway frame encoding and decoding.
//!
//! Outbound frames are compact JSON objects shaped `{id?, method, params?}`.
//! Inbound datagrams carry one or more JSON objects written back to back
//! with no separator, optionally followed by a single NUL byte of padding.
//!
//! # Request ids
//!
//! Every outbound message except the liveness probe carries an id from
//! [`RequestIdCounter`]: `1, 2, 3, ...` up to [`MAX_REQUEST_ID`], never
//! [`RESERVED_REQUEST_ID`], wrapping back to `1`.
//!
//! # Known limitation
//!
//! Concatenated objects are split by rewriting every `}{` into `},{` before
//! parsing the text as a JSON array. A string value that itself contains
//! `}{` is corrupted by that rewrite: it either decodes with the altered
//! text or makes the whole datagram malformed. Observed gateway traffic
//! never contains that sequence.
//!
//! All functions in this module are pure; no I/O is performed.

use serde::Serialize;
use serde_json::Value;

use migw_core::error::{Error, Result};
use migw_core::types::{Command, MAX_DATAGRAM_LEN};

/// Highest request id before the counter wraps to 1.
pub const MAX_REQUEST_ID: u32 = 999_999_999;

/// Request id the gateway reserves; never assigned.
pub const RESERVED_REQUEST_ID: u32 = 12345;

/// Monotonic request id source.
#[derive(Debug, Default)]
pub struct RequestIdCounter {
    last: u32,
}

impl RequestIdCounter {
    /// A counter whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter that continues after `last`.
    pub fn starting_after(last: u32) -> Self {
        Self {
            last: last.min(MAX_REQUEST_ID),
        }
    }

    /// The most recently assigned id (0 before the first assignment).
    pub fn last(&self) -> u32 {
        self.last
    }

    /// Assign the next request id.
    pub fn next_id(&mut self) -> u32 {
        let mut next = self.last + 1;
        if next == RESERVED_REQUEST_ID {
            next += 1;
        }
        if next > MAX_REQUEST_ID {
            next = 1;
        }
        self.last = next;
        next
    }
}

/// Wire shape of an outbound message.
#[derive(Serialize)]
struct OutboundMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u32>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

/// Stateful encoder owning the request id counter.
///
/// Owned by the gateway worker; nothing else assigns ids.
#[derive(Debug, Default)]
pub struct FrameCodec {
    ids: RequestIdCounter,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec using the given id counter.
    pub fn with_counter(ids: RequestIdCounter) -> Self {
        Self { ids }
    }

    /// The id counter.
    pub fn ids(&self) -> &RequestIdCounter {
        &self.ids
    }

    /// Encode a command into a datagram payload.
    ///
    /// The liveness probe is serialized without an id. Params that are
    /// absent or empty (see [`is_empty_params`]) are omitted. Fails with
    /// [`Error::FrameTooLarge`] when the result does not fit in one datagram.
    pub fn encode(&mut self, command: &Command) -> Result<Vec<u8>> {
        let id = if command.is_probe() {
            None
        } else {
            Some(self.ids.next_id())
        };

        let message = OutboundMessage {
            id,
            method: &command.method,
            params: command.params.as_ref().filter(|p| !is_empty_params(p)),
        };
        let frame = serde_json::to_vec(&message)?;

        if frame.len() > MAX_DATAGRAM_LEN {
            return Err(Error::FrameTooLarge {
                len: frame.len(),
                max: MAX_DATAGRAM_LEN,
            });
        }
        Ok(frame)
    }
}

/// Whether `params` carries nothing worth sending: null, `false`, zero,
/// an empty string, an empty array or an empty object.
pub fn is_empty_params(params: &Value) -> bool {
    match params {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Decode a datagram into the messages it carries.
///
/// A single trailing NUL is stripped. Objects written back to back are
/// split apart (see the module docs for the limitation this implies).
/// Undecodable input is logged and yields an empty batch.
pub fn decode(data: &[u8]) -> Vec<Value> {
    let data = data.strip_suffix(&[0]).unwrap_or(data);

    let text = match std::str::from_utf8(data) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, bytes = data.len(), "Datagram is not valid UTF-8");
            return Vec::new();
        }
    };

    let joined = format!("[{}]", text.replace("}{", "},{"));
    match serde_json::from_str::<Vec<Value>>(&joined) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, text = %text, "Bad JSON received");
            Vec::new()
        }
    }
}
