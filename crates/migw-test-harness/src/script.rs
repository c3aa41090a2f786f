//! Scripted replies shared by the mock transport and the mock peer.
//!
//! A [`Script`] maps request method names to reply builders. When a request
//! arrives, its JSON body is handed to the builder registered for its
//! method and the returned datagrams are delivered back to the client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

type ReplyFn = Box<dyn Fn(&Value) -> Vec<Vec<u8>> + Send + Sync>;

/// Method-keyed reply script. Cloning shares the same script.
#[derive(Clone, Default)]
pub struct Script {
    replies: Arc<Mutex<HashMap<String, ReplyFn>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reply builder for `method`, replacing any earlier one.
    pub fn respond<F>(&self, method: &str, reply: F)
    where
        F: Fn(&Value) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies.insert(method.to_string(), Box::new(reply));
    }

    /// Answer `method` with `{"id": <request id>, "result": [result]}`.
    ///
    /// Requests without an id (the liveness probe) get a reply without one.
    pub fn reply_result(&self, method: &str, result: Value) {
        self.respond(method, move |request| {
            let reply = match request.get("id") {
                Some(id) => json!({"id": id, "result": [result.clone()]}),
                None => json!({"result": [result.clone()]}),
            };
            vec![reply.to_string().into_bytes()]
        });
    }

    /// Build the replies for a raw request datagram.
    ///
    /// Unparseable requests and unscripted methods produce no reply.
    pub fn replies_for(&self, request: &[u8]) -> Vec<Vec<u8>> {
        let Ok(value) = serde_json::from_slice::<Value>(request) else {
            tracing::debug!(bytes = request.len(), "mock: request is not a JSON object");
            return Vec::new();
        };
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return Vec::new();
        };

        let replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        match replies.get(method) {
            Some(reply) => reply(&value),
            None => {
                tracing::debug!(method = %method, "mock: no scripted reply");
                Vec::new()
            }
        }
    }
}
