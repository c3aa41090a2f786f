//! migw-test-harness: Test utilities and mock peers for migw.
//!
//! This crate provides [`MockTransport`] for deterministic in-memory
//! testing of the gateway engine, and [`MockPeer`] for exercising the real
//! UDP transport against a scripted gateway on loopback.

pub mod mock_peer;
pub mod mock_transport;
pub mod script;

pub use mock_peer::MockPeer;
pub use mock_transport::{MockHandle, MockTransport};
pub use script::Script;
