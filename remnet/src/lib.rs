//! Bridge a simulated network device to a remote frame transport.
//!
//! ```no_run
//! use std::{net::Ipv4Addr, sync::Arc};
//!
//! use remnet::{
//!     Bytes, DeviceConfig, MacAddr, NetDevice, RemoteEndpoint, RemoteNetDevice, Simulator, Tcp,
//! };
//!
//! let mut sim = Simulator::new();
//! let device = RemoteNetDevice::new(
//!     sim.handle(),
//!     Tcp::default(),
//!     DeviceConfig::default().with_remote(RemoteEndpoint::new(Ipv4Addr::LOCALHOST, 9000, 1)),
//! );
//! device.set_node(0);
//! device.set_receive_callback(Arc::new(
//!     |_: &dyn NetDevice, packet: Bytes, protocol: u16, source: MacAddr| {
//!         println!("{source} sent {} bytes of protocol {protocol:#06x}", packet.len());
//!     },
//! ));
//!
//! sim.run();
//! ```

pub use bytes::Bytes;
pub use remnet_device::*;
pub use remnet_sim::{EventId, SimHandle, SimTime, Simulator};
pub use remnet_transport::{Ipc, NetId, RemoteEndpoint, Tcp, Transport};
#[cfg(feature = "mock")]
pub use remnet_transport::Mock;

pub use remnet_sim as sim;
pub use remnet_transport as transport;
pub use remnet_wire as wire;
