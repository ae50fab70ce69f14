use std::{
    io,
    net::Shutdown,
    os::unix::net::UnixStream,
    path::PathBuf,
    sync::Arc,
};

use tracing::debug;

use crate::{announce, Channel, Client, RemoteEndpoint, Result, Transport};

/// Connects devices to a frame distributor on the same machine through a Unix domain socket.
///
/// The socket path replaces the server address and port for addressing; the endpoint still
/// has to be valid for a device to start, and its network id is announced after connecting.
#[derive(Debug, Clone)]
pub struct Ipc {
    path: PathBuf,
}

impl Ipc {
    /// Connects clients to the socket at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Transport for Ipc {
    type Client = IpcClient;

    fn client(&self, remote: RemoteEndpoint) -> Self::Client {
        IpcClient { path: self.path.clone(), remote, stream: None }
    }
}

/// Client of the [`Ipc`] transport.
#[derive(Debug)]
pub struct IpcClient {
    path: PathBuf,
    remote: RemoteEndpoint,
    stream: Option<Arc<UnixStream>>,
}

impl Client for IpcClient {
    type Channel = UnixStream;

    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = UnixStream::connect(&self.path)?;
        announce(&stream, self.remote.net)?;

        debug!(path = ?self.path, net = self.remote.net, "connected to local endpoint");
        self.stream = Some(Arc::new(stream));

        Ok(())
    }

    fn channel(&self) -> Option<Arc<Self::Channel>> {
        self.stream.clone()
    }

    fn stop(&mut self) {
        let Some(stream) = &self.stream else { return };

        if let Err(e) = stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                debug!(?e, "failed to shut down unix stream");
            }
        }
    }

    fn join(&mut self) {
        self.stream = None;
    }
}

impl Channel for UnixStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }
}
