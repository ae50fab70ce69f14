//! An in-memory transport for tests.
//!
//! Inbound frames are injected through the [`Mock`] handle and handed out one per read, the
//! way a datagram-preserving distributor would deliver them. Everything the device writes is
//! captured and can be inspected afterwards.

use std::{
    collections::VecDeque,
    io,
    sync::Arc,
};

use bytes::Bytes;
use parking_lot::{Condvar, Mutex};

use crate::{Channel, Client, RemoteEndpoint, Result, Transport};

#[derive(Debug)]
enum Inbound {
    Frame(Bytes),
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct State {
    inbound: VecDeque<Inbound>,
    written: Vec<Bytes>,
    /// Set when the current client is stopped; reads then report the end of the stream.
    closed: bool,
    starts: usize,
    remotes: Vec<RemoteEndpoint>,
    refuse_start: bool,
    withhold_channel: bool,
    write_error: Option<io::ErrorKind>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    readable: Condvar,
}

/// Handle to the in-memory transport. Clones share the same state.
#[derive(Debug, Default, Clone)]
pub struct Mock {
    shared: Arc<Shared>,
}

impl Mock {
    /// Creates a transport with nothing injected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a frame for the next read.
    pub fn inject(&self, frame: impl Into<Bytes>) {
        self.shared.state.lock().inbound.push_back(Inbound::Frame(frame.into()));
        self.shared.readable.notify_all();
    }

    /// Makes the next read fail with `kind`.
    pub fn inject_error(&self, kind: io::ErrorKind) {
        self.shared.state.lock().inbound.push_back(Inbound::Error(kind));
        self.shared.readable.notify_all();
    }

    /// Number of injected frames not yet read.
    pub fn pending_reads(&self) -> usize {
        self.shared.state.lock().inbound.len()
    }

    /// Returns a copy of every buffer written so far.
    pub fn written(&self) -> Vec<Bytes> {
        self.shared.state.lock().written.clone()
    }

    /// How many times a client of this transport was started.
    pub fn starts(&self) -> usize {
        self.shared.state.lock().starts
    }

    /// The endpoints clients were created for, oldest first.
    pub fn remotes(&self) -> Vec<RemoteEndpoint> {
        self.shared.state.lock().remotes.clone()
    }

    /// Makes subsequent client starts fail with a refused connection.
    pub fn refuse_start(&self, refuse: bool) {
        self.shared.state.lock().refuse_start = refuse;
    }

    /// Makes subsequent client starts succeed without ever exposing a channel.
    pub fn withhold_channel(&self, withhold: bool) {
        self.shared.state.lock().withhold_channel = withhold;
    }

    /// Makes writes fail with `kind`, or succeed again with `None`.
    pub fn fail_writes(&self, kind: Option<io::ErrorKind>) {
        self.shared.state.lock().write_error = kind;
    }
}

impl Transport for Mock {
    type Client = MockClient;

    fn client(&self, remote: RemoteEndpoint) -> Self::Client {
        self.shared.state.lock().remotes.push(remote);
        MockClient { shared: Arc::clone(&self.shared), channel: None }
    }
}

/// Client of the [`Mock`] transport.
#[derive(Debug)]
pub struct MockClient {
    shared: Arc<Shared>,
    channel: Option<Arc<MockChannel>>,
}

impl Client for MockClient {
    type Channel = MockChannel;

    fn start(&mut self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.refuse_start {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
        }

        state.starts += 1;
        state.closed = false;
        if !state.withhold_channel {
            self.channel = Some(Arc::new(MockChannel { shared: Arc::clone(&self.shared) }));
        }

        Ok(())
    }

    fn channel(&self) -> Option<Arc<Self::Channel>> {
        self.channel.clone()
    }

    fn stop(&mut self) {
        self.shared.state.lock().closed = true;
        self.shared.readable.notify_all();
    }

    fn join(&mut self) {
        self.channel = None;
    }
}

/// Channel of a started [`MockClient`].
#[derive(Debug)]
pub struct MockChannel {
    shared: Arc<Shared>,
}

impl Channel for MockChannel {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.shared.state.lock();

        loop {
            if state.closed {
                return Ok(0);
            }

            match state.inbound.pop_front() {
                Some(Inbound::Frame(frame)) => {
                    let n = frame.len().min(buf.len());
                    buf[..n].copy_from_slice(&frame[..n]);
                    return Ok(n);
                }
                Some(Inbound::Error(kind)) => return Err(kind.into()),
                None => self.shared.readable.wait(&mut state),
            }
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.shared.state.lock();

        if let Some(kind) = state.write_error {
            return Err(kind.into());
        }
        if state.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }

        state.written.push(Bytes::copy_from_slice(buf));
        Ok(buf.len())
    }
}
