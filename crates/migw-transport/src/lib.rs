//! Transport implementations for migw.
//!
//! This crate provides [`UdpTransport`], the concrete
//! [`Transport`](migw_core::Transport) used to talk to a gateway: a tokio
//! UDP socket bound locally and aimed at a single peer address.
//!
//! # Example
//!
//! ```no_run
//! use migw_transport::UdpTransport;
//! use migw_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> migw_core::Result<()> {
//! let peer = "192.168.1.20:54321".parse().unwrap();
//! let mut transport = UdpTransport::bind("0.0.0.0:0", peer).await?;
//!
//! transport.send(br#"{"method":"internal.PING"}"#).await?;
//!
//! let mut buf = [0u8; 1480];
//! let n = transport.receive(&mut buf, Duration::from_secs(2)).await?;
//! # Ok(())
//! # }
//! ```

pub mod udp;

pub use udp::UdpTransport;
