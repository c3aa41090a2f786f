//! Shared protocol types and constants.

use serde_json::Value;

/// Method name of the liveness probe. Probes carry no request id.
pub const PROBE_METHOD: &str = "internal.PING";

/// Result value a peer returns to a probe when it considers itself online.
pub const ONLINE_STATUS: &str = "online";

/// Maximum datagram payload exchanged with the peer, in bytes.
pub const MAX_DATAGRAM_LEN: usize = 1480;

/// Device model assumed when an inbound message carries no `model` field.
pub const INTERNAL_MODEL: &str = "internal";

/// Model identifier of the gateway itself.
pub const GATEWAY_MODEL: &str = "lumi.gateway.mieu01";

/// A request destined for the peer.
///
/// Commands are produced by sub-device controllers, the heartbeat monitor,
/// or external callers, and consumed exactly once by the gateway worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Remote method name (e.g. `"get_doorbell_push"`).
    pub method: String,
    /// Optional method parameters. `None` omits the field on the wire.
    pub params: Option<Value>,
    /// Whether the worker should treat a `result` in the reply window as
    /// this command's answer.
    pub expect_result: bool,
}

impl Command {
    /// Create a command with no parameters that does not expect a result.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: None,
            expect_result: false,
        }
    }

    /// Attach parameters to the command.
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    /// Mark whether the command expects a result.
    pub fn expect_result(mut self, expect: bool) -> Self {
        self.expect_result = expect;
        self
    }

    /// The liveness probe command.
    pub fn probe() -> Self {
        Self::new(PROBE_METHOD).expect_result(true)
    }

    /// Whether this command is the liveness probe.
    pub fn is_probe(&self) -> bool {
        self.method == PROBE_METHOD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_builder_chain() {
        let cmd = Command::new("set_doorbell_volume")
            .with_params(json!([5]))
            .expect_result(true);
        assert_eq!(cmd.method, "set_doorbell_volume");
        assert_eq!(cmd.params, Some(json!([5])));
        assert!(cmd.expect_result);
    }

    #[test]
    fn command_defaults() {
        let cmd = Command::new("get_doorbell_push");
        assert!(cmd.params.is_none());
        assert!(!cmd.expect_result);
        assert!(!cmd.is_probe());
    }

    #[test]
    fn probe_command_shape() {
        let probe = Command::probe();
        assert!(probe.is_probe());
        assert!(probe.expect_result);
        assert!(probe.params.is_none());
    }
}
