use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use bytes::{Bytes, BytesMut};
use remnet_transport::{Channel, Client};
use thiserror::Error;
use tracing::{debug, error, warn};

#[allow(non_upper_case_globals)]
const KiB: usize = 1024;

/// Size of the buffer allocated for every read. A read never returns more than one frame.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * KiB;

/// Why a [`FrameReader`] did not start.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The transport client failed to connect.
    #[error("transport error: {0}")]
    Transport(#[from] remnet_transport::Error),
    /// The client started but exposes no channel to read from.
    #[error("client started without a channel")]
    ChannelUnavailable,
    /// The reader thread is already running.
    #[error("reader already started")]
    AlreadyStarted,
    /// Reads into an empty buffer would look like the end of the stream.
    #[error("read buffer size must not be zero")]
    ZeroBufferSize,
    /// The OS refused to spawn the reader thread.
    #[error("failed to spawn reader thread: {0}")]
    Spawn(io::Error),
}

/// A link-layer frame as read from the transport.
///
/// Frames are move-only: whoever holds one owns the buffer, and the buffer is released when
/// the frame is dropped.
#[derive(Debug)]
pub struct Frame {
    buf: Bytes,
}

impl Frame {
    /// Wraps a received buffer.
    #[inline]
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    /// Length of the frame in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Takes the buffer out of the frame.
    #[inline]
    pub fn into_bytes(self) -> Bytes {
        self.buf
    }
}

/// Turns blocking reads on a transport client into a stream of [`Frame`]s pushed to a
/// callback, from a dedicated thread.
///
/// The callback runs on the reader thread and must not touch simulation state.
#[derive(Debug)]
pub struct FrameReader<C: Client> {
    client: C,
    buffer_size: usize,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl<C: Client> FrameReader<C> {
    /// Creates a reader for `client` that reads into buffers of `buffer_size` bytes. Nothing
    /// happens until [`start`](Self::start).
    pub fn new(client: C, buffer_size: usize) -> Self {
        Self { client, buffer_size, stop: Arc::new(AtomicBool::new(false)), thread: None }
    }

    /// Starts the client, then the reader thread.
    ///
    /// Fails without spawning anything if the client cannot connect or does not expose a
    /// channel once started.
    pub fn start<F>(&mut self, callback: F) -> Result<(), ReaderError>
    where
        F: FnMut(Frame) + Send + 'static,
    {
        if self.thread.is_some() {
            return Err(ReaderError::AlreadyStarted);
        }

        if self.buffer_size == 0 {
            return Err(ReaderError::ZeroBufferSize);
        }

        self.client.start()?;

        let Some(channel) = self.client.channel() else {
            self.shutdown_client();
            return Err(ReaderError::ChannelUnavailable);
        };

        self.stop.store(false, Ordering::Release);
        let stop = Arc::clone(&self.stop);
        let buffer_size = self.buffer_size;
        let span = tracing::Span::current();

        let spawned = thread::Builder::new().name("remnet-reader".into()).spawn(move || {
            let _span = span.entered();
            read_loop(channel, buffer_size, stop, callback);
        });

        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shutdown_client();
                Err(ReaderError::Spawn(e))
            }
        }
    }

    /// Stops the reader and waits for its thread to exit. Once this returns the callback is
    /// never invoked again. Does nothing if the reader is not running.
    pub fn stop(&mut self) {
        let Some(handle) = self.thread.take() else { return };

        self.stop.store(true, Ordering::Release);
        // Unblocks the pending read.
        self.client.stop();

        if let Err(e) = handle.join() {
            error!(?e, "reader thread panicked");
        }

        self.client.join();
        debug!("reader stopped");
    }

    /// Writes `buf` to the transport as is. Writes nothing and returns `Ok(0)` if the client is
    /// not connected.
    pub fn write_raw(&self, buf: &[u8]) -> io::Result<usize> {
        let Some(channel) = self.client.channel() else {
            error!(len = buf.len(), "client not ready, frame not written");
            return Ok(0);
        };

        channel.write(buf)
    }

    /// Returns `true` between a successful [`start`](Self::start) and [`stop`](Self::stop),
    /// even if the thread has already exited.
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Returns `true` if the reader was started and its thread has exited, because the stream
    /// ended or a read failed.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_some_and(JoinHandle::is_finished)
    }

    fn shutdown_client(&mut self) {
        self.client.stop();
        self.client.join();
    }
}

impl<C: Client> Drop for FrameReader<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<Ch, F>(channel: Arc<Ch>, buffer_size: usize, stop: Arc<AtomicBool>, mut callback: F)
where
    Ch: Channel,
    F: FnMut(Frame),
{
    debug!(buffer_size, "reader started");

    while !stop.load(Ordering::Acquire) {
        let mut buf = BytesMut::zeroed(buffer_size);

        match channel.read(&mut buf) {
            Ok(0) => {
                debug!("end of stream");
                break;
            }
            Ok(n) => {
                buf.truncate(n);
                callback(Frame::new(buf.freeze()));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if !stop.load(Ordering::Acquire) {
                    warn!(?e, "failed to read from client");
                }
                break;
            }
        }
    }

    debug!("reader exiting");
}
