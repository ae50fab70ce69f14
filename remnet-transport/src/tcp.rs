use std::{
    io,
    net::{Shutdown, SocketAddr, TcpStream},
    sync::Arc,
    time::Duration,
};

use tracing::debug;

use crate::{announce, Channel, Client, Error, RemoteEndpoint, Result, Transport};

/// Settings of [`Tcp`] clients.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on how long [`Client::start`] blocks while connecting.
    pub connect_timeout: Duration,
    /// Disables Nagle's algorithm so small frames are not held back.
    pub nodelay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(5), nodelay: true }
    }
}

/// Connects devices to a frame distributor listening on TCP.
#[derive(Debug, Default, Clone)]
pub struct Tcp {
    config: Config,
}

impl Tcp {
    /// Creates a transport whose clients use `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Transport for Tcp {
    type Client = TcpClient;

    fn client(&self, remote: RemoteEndpoint) -> Self::Client {
        TcpClient { remote, config: self.config.clone(), stream: None }
    }
}

/// Client of the [`Tcp`] transport.
#[derive(Debug)]
pub struct TcpClient {
    remote: RemoteEndpoint,
    config: Config,
    stream: Option<Arc<TcpStream>>,
}

impl Client for TcpClient {
    type Channel = TcpStream;

    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let addr = SocketAddr::V4(self.remote.socket_addr());
        let stream =
            TcpStream::connect_timeout(&addr, self.config.connect_timeout).map_err(|e| {
                if e.kind() == io::ErrorKind::TimedOut {
                    Error::Timeout(addr.to_string())
                } else {
                    Error::Io(e)
                }
            })?;

        stream.set_nodelay(self.config.nodelay)?;
        announce(&stream, self.remote.net)?;

        debug!(%addr, net = self.remote.net, "connected to remote endpoint");
        self.stream = Some(Arc::new(stream));

        Ok(())
    }

    fn channel(&self) -> Option<Arc<Self::Channel>> {
        self.stream.clone()
    }

    fn stop(&mut self) {
        let Some(stream) = &self.stream else { return };

        // Wakes up any thread blocked in `read`, which then sees the end of the stream.
        if let Err(e) = stream.shutdown(Shutdown::Both) {
            if e.kind() != io::ErrorKind::NotConnected {
                debug!(?e, "failed to shut down tcp stream");
            }
        }
    }

    fn join(&mut self) {
        self.stream = None;
    }
}

impl Channel for TcpStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }
}
