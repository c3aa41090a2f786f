//! # migw -- client for UDP home-automation gateways
//!
//! `migw` talks to a single gateway over its JSON-over-UDP control
//! protocol. It queues commands, correlates replies, decodes the
//! gateway's back-to-back JSON datagrams, watches the gateway's liveness,
//! and forwards device traffic to a notification sink.
//!
//! ## Quick Start
//!
//! ```no_run
//! use migw::{GatewayBuilder, Notification};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = GatewayBuilder::new()
//!         .host("192.168.1.20")
//!         .on_notification(|n: Notification| println!("{} {}", n.topic(), n.payload()))
//!         .build()
//!         .await?;
//!     gateway.start()?;
//!
//!     gateway.doorbell().get_push().await?;
//!     tokio::signal::ctrl_c().await?;
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Module         | Purpose                                               |
//! |----------------|-------------------------------------------------------|
//! | [`codec`]      | Request ids, outbound encoding, concatenated-JSON decoding |
//! | [`classify`]   | Method string to [`MessageKind`]                      |
//! | [`dispatch`]   | Message routing to notifications and the light ring   |
//! | [`queue`]      | Bounded FIFO between producers and the worker         |
//! | [`heartbeat`]  | Probe scheduling and offline detection                |
//! | [`gateway`]    | [`Gateway`] handle and worker lifecycle               |
//! | [`builder`]    | [`GatewayBuilder`]                                    |
//! | [`devices`]    | Doorbell and light ring controllers                   |
//!
//! All socket I/O happens on one spawned worker task. Everything else
//! (callers, controllers) only touches the command queue.

pub mod builder;
pub mod classify;
pub mod codec;
mod correlator;
pub mod devices;
pub mod dispatch;
pub mod gateway;
pub mod heartbeat;
mod io;
pub mod notifier;
pub mod queue;

pub use builder::GatewayBuilder;
pub use classify::MessageKind;
pub use devices::{Doorbell, LightRing};
pub use gateway::Gateway;
pub use heartbeat::{HeartbeatMonitor, PeerState};
pub use queue::CommandQueue;

pub use migw_core::{
    Command, CommandResult, CommandSubmitter, DeviceEvent, Error, Notification,
    NotificationSink, PropertyUpdate, Result, StatusUpdate, Topic, Transport,
};
pub use migw_transport::UdpTransport;
