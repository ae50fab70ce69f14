//! A simulated network device bridged to a remote frame transport.
//!
//! [`RemoteNetDevice`] reads Ethernet frames from a [`Transport`](remnet_transport::Transport)
//! on a background thread and delivers them to its receive callbacks on the simulation
//! thread. Packets sent through the device are framed and written back to the transport.
//!
//! ```text
//! remote ── Client ── FrameReader (thread) ── HandoffQueue ── dispatch event ── callbacks
//! ```

mod config;
mod device;
mod net_device;
mod queue;
mod reader;

pub use config::{DeviceConfig, DEFAULT_MTU};
pub use device::{DeviceStats, LinkState, RemoteNetDevice, SendError, StartError};
pub use net_device::{
    LinkChangeCallback, NetDevice, NodeId, PromiscReceiveCallback, ReceiveCallback,
};
pub use queue::{HandoffQueue, DEFAULT_QUEUE_CAPACITY};
pub use reader::{Frame, FrameReader, ReaderError, DEFAULT_READ_BUFFER_SIZE};

pub use remnet_wire::{MacAddr, PacketType};
