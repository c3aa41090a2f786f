//! Sub-device controllers.
//!
//! Controllers are thin command builders. Each one holds only an
//! `Arc<dyn CommandSubmitter>` and never touches the socket.

pub mod doorbell;
pub mod light_ring;

pub use doorbell::{Doorbell, DoorbellSettings};
pub use light_ring::{LightRing, LightRingState, pack_rgb, parse_color, unpack_rgb};
