//! Client transports connecting a device to its remote frame source.
//!
//! A [`Transport`] is a factory: every time a device starts it asks the transport for a fresh
//! [`Client`] bound to the configured [`RemoteEndpoint`]. The client owns the connection and
//! exposes it as a shared [`Channel`] that one thread can block on for reads while another
//! writes to it.

use std::{
    fmt, io,
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

/// Unix domain socket transport.
pub mod ipc;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
/// TCP transport.
pub mod tcp;

pub use ipc::Ipc;
#[cfg(any(test, feature = "mock"))]
pub use mock::Mock;
pub use tcp::Tcp;

/// Why a client failed to connect.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connecting or announcing the network id failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The connect timeout elapsed.
    #[error("connecting to {0} timed out")]
    Timeout(String),
}

/// Result of connecting a client.
pub type Result<T> = std::result::Result<T, Error>;

/// Identifies the network a client joins on the remote endpoint.
pub type NetId = u32;

/// Where the frames of a device come from and go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteEndpoint {
    /// Address of the remote frame distributor.
    pub server: Ipv4Addr,
    /// Port of the remote frame distributor.
    pub port: u16,
    /// Network the client joins, announced right after connecting.
    pub net: NetId,
}

impl RemoteEndpoint {
    #[inline]
    pub fn new(server: Ipv4Addr, port: u16, net: NetId) -> Self {
        Self { server, port, net }
    }

    /// An endpoint is usable once both the server address and the port are set. Network id 0
    /// is a valid network.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.server.is_unspecified() && self.port != 0
    }

    /// The socket address clients connect to.
    #[inline]
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.server, self.port)
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.server, self.port, self.net)
    }
}

/// A connected byte channel. Both methods take `&self` so a reader thread and a writer can
/// share the channel through an [`Arc`].
pub trait Channel: Send + Sync + 'static {
    /// Blocks until some bytes are available. `Ok(0)` means the stream has ended.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes some of `buf`, returning how many bytes went out.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;
}

/// The connection to a remote endpoint.
pub trait Client: Send + 'static {
    type Channel: Channel;

    /// Establishes the connection. Blocks at most for the client's connect timeout.
    fn start(&mut self) -> Result<()>;

    /// Returns the connected channel, or `None` if the client is not connected.
    fn channel(&self) -> Option<Arc<Self::Channel>>;

    /// Requests shutdown. A thread blocked in [`Channel::read`] must be woken up and observe
    /// the end of the stream.
    fn stop(&mut self);

    /// Waits until all work tied to the connection has quiesced and releases the channel.
    fn join(&mut self);
}

/// Creates clients for remote endpoints, one per device start.
pub trait Transport: Send + Sync + 'static {
    type Client: Client;

    /// Creates a new, not yet started client for `remote`.
    fn client(&self, remote: RemoteEndpoint) -> Self::Client;
}

/// Writes the network id preamble every client sends right after connecting.
pub(crate) fn announce<W: io::Write>(mut io: W, net: NetId) -> io::Result<()> {
    io.write_all(&net.to_be_bytes())?;
    io.flush()
}
