//! Link-layer wire format for remnet.
//!
//! Frames exchanged with the remote endpoint are plain Ethernet II frames without a trailing
//! CRC. This crate parses and builds their headers and decides which receive paths a frame is
//! meant for.

/// Sorting frames by destination.
pub mod classify;
/// Ethernet II headers.
pub mod ethernet;
/// MAC address helpers.
pub mod mac;

pub use classify::{classify, PacketType};
pub use ethernet::{EthernetHeader, HEADER_LEN};
pub use mac::{multicast_v4, multicast_v6, MacAddrExt, BROADCAST};

pub use pnet::util::MacAddr;
