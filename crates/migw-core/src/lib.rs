//! migw-core: Core traits, types, and error definitions for migw.
//!
//! This crate defines the transport-agnostic abstractions shared by the
//! gateway protocol engine, its transports, and its test harness.
//!
//! # Key types
//!
//! - [`Command`] -- an outbound request queued for the peer
//! - [`Notification`] -- normalized device traffic delivered to the sink
//! - [`Transport`] -- datagram-level communication channel to the peer
//! - [`CommandSubmitter`] -- the narrow queueing capability handed to sub-device controllers
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod submit;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use migw_core::*`.
pub use error::{Error, Result};
pub use events::{
    CommandResult, DeviceEvent, Notification, NotificationSink, PropertyUpdate, StatusUpdate,
    Topic,
};
pub use submit::CommandSubmitter;
pub use transport::Transport;
pub use types::*;
