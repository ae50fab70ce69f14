use std::{
    fmt, io,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use parking_lot::Mutex;
use remnet_sim::{EventId, SimHandle, SimTime};
use remnet_transport::{RemoteEndpoint, Transport};
use remnet_wire::MacAddr;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::{
    net_device::{LinkChangeCallback, NodeId, PromiscReceiveCallback, ReceiveCallback},
    queue::HandoffQueue,
    reader::{Frame, FrameReader, ReaderError},
    DeviceConfig,
};

mod iface;
mod rx;
mod stats;
mod tx;

pub use stats::DeviceStats;

/// Why a scheduled start left the device down. Logged by the start event.
#[derive(Debug, Error)]
pub enum StartError {
    /// No remote endpoint was configured.
    #[error("no remote endpoint configured")]
    NoRemote,
    /// The remote endpoint lacks a server address or a port.
    #[error("invalid remote endpoint {0}")]
    InvalidRemote(RemoteEndpoint),
    /// The device has no node to deliver frames on behalf of.
    #[error("device is not attached to a node")]
    NotAttached,
    /// The transport client or the reader thread failed to start.
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),
}

/// Why a packet was not sent.
#[derive(Debug, Error)]
pub enum SendError {
    /// The link is down. Nothing was written.
    #[error("link is down")]
    LinkDown,
    /// The framed packet, header included, is larger than the MTU. Nothing was written.
    #[error("frame of {size} bytes exceeds the MTU of {mtu}")]
    MtuExceeded { size: usize, mtu: u16 },
    /// Writing to the transport failed.
    #[error("IO error: {0:?}")]
    Io(#[from] io::Error),
}

/// Lifecycle of a [`RemoteNetDevice`]. A stopped device can be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Never started, or the last start failed.
    Unconfigured,
    /// A start is connecting the client.
    Starting,
    /// The reader is running.
    Up,
    /// A stop is shutting the reader down.
    Stopping,
    /// Stopped. A new start reconnects.
    Down,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::Starting => "starting",
            Self::Up => "up",
            Self::Stopping => "stopping",
            Self::Down => "down",
        };
        f.write_str(s)
    }
}

/// Device state touched by the simulation thread only.
struct State {
    address: MacAddr,
    mtu: u16,
    if_index: u32,
    node: Option<NodeId>,
    remote: Option<RemoteEndpoint>,
    link_up: bool,
    link_state: LinkState,
    is_broadcast: bool,
    is_multicast: bool,
    start_event: Option<EventId>,
    stop_event: Option<EventId>,
    rx: Option<ReceiveCallback>,
    promisc_rx: Option<PromiscReceiveCallback>,
    link_callbacks: Vec<LinkChangeCallback>,
}

struct Inner<T: Transport> {
    transport: T,
    sim: SimHandle,
    read_buffer_size: usize,
    link_down_on_stop: bool,
    state: Mutex<State>,
    reader: Mutex<Option<FrameReader<T::Client>>>,
    queue: Arc<HandoffQueue<Frame>>,
    /// Bumped on every stop. Dispatch events posted for an older epoch are ignored.
    epoch: AtomicU64,
    stats: DeviceStats,
}

impl<T: Transport> Inner<T> {
    /// Stops the reader, if any, and discards every frame it left behind.
    fn shutdown_reader(&self) {
        let reader = self.reader.lock().take();
        if let Some(mut reader) = reader {
            // Joins the reader thread: nothing is enqueued after this.
            reader.stop();
        }

        self.discard_queued();
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    fn discard_queued(&self) {
        let drained = self.queue.drain();
        if drained > 0 {
            self.stats.increment_discarded(drained);
            debug!(drained, "discarded undelivered frames");
        }
    }

    /// Returns `true` if a reader exists but its thread has exited on its own, after the
    /// remote closed the stream or a read failed.
    fn reader_exited(&self) -> bool {
        self.reader.lock().as_ref().is_some_and(FrameReader::is_finished)
    }
}

impl<T: Transport> Drop for Inner<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for id in [state.start_event.take(), state.stop_event.take()].into_iter().flatten() {
            self.sim.cancel(id);
        }

        self.shutdown_reader();
    }
}

/// A simulated network device whose frames come from, and go to, a remote endpoint over a
/// [`Transport`].
///
/// A background thread reads frames from the transport and hands them to the simulation
/// through a bounded queue. Each frame is then decoded and dispatched to the receive callbacks
/// on the simulation thread, in arrival order. Outgoing packets are framed and written to the
/// transport synchronously.
///
/// Handles are cheap to clone and all refer to the same device. The device is torn down when
/// the last handle is dropped or [`dispose`](Self::dispose) is called.
pub struct RemoteNetDevice<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for RemoteNetDevice<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Transport> fmt::Debug for RemoteNetDevice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RemoteNetDevice")
            .field("address", &state.address)
            .field("node", &state.node)
            .field("remote", &state.remote)
            .field("link_state", &state.link_state)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RemoteNetDevice<T> {
    /// Creates a device and schedules its start, and its stop if configured, relative to the
    /// current simulated time.
    pub fn new(sim: SimHandle, transport: T, config: DeviceConfig) -> Self {
        let state = State {
            address: config.address,
            mtu: config.mtu,
            if_index: 0,
            node: None,
            remote: config.remote,
            link_up: false,
            link_state: LinkState::Unconfigured,
            is_broadcast: true,
            is_multicast: false,
            start_event: None,
            stop_event: None,
            rx: None,
            promisc_rx: None,
            link_callbacks: Vec::new(),
        };

        let device = Self {
            inner: Arc::new(Inner {
                transport,
                sim,
                read_buffer_size: config.read_buffer_size,
                link_down_on_stop: config.link_down_on_stop,
                state: Mutex::new(state),
                reader: Mutex::new(None),
                queue: Arc::new(HandoffQueue::new(config.rx_queue_size)),
                epoch: AtomicU64::new(0),
                stats: DeviceStats::default(),
            }),
        };

        device.start(config.start);
        if let Some(stop) = config.stop {
            device.stop(stop);
        }

        device
    }

    /// Schedules the device to start after `delay`, replacing any pending start.
    pub fn start(&self, delay: Duration) {
        let weak = self.downgrade();
        let id = self.inner.sim.schedule(delay, move || {
            if let Some(device) = Self::upgrade(&weak) {
                device.inner.state.lock().start_event = None;
                device.start_device();
            }
        });

        if let Some(previous) = self.inner.state.lock().start_event.replace(id) {
            self.inner.sim.cancel(previous);
        }
    }

    /// Schedules the device to stop after `delay`, replacing any pending stop.
    pub fn stop(&self, delay: Duration) {
        let weak = self.downgrade();
        let id = self.inner.sim.schedule(delay, move || {
            if let Some(device) = Self::upgrade(&weak) {
                device.inner.state.lock().stop_event = None;
                device.stop_device();
            }
        });

        if let Some(previous) = self.inner.state.lock().stop_event.replace(id) {
            self.inner.sim.cancel(previous);
        }
    }

    /// Sets the endpoint the next start connects to.
    pub fn set_remote(&self, remote: RemoteEndpoint) {
        self.inner.state.lock().remote = Some(remote);
    }

    /// The endpoint the next start connects to, if one is set.
    pub fn remote(&self) -> Option<RemoteEndpoint> {
        self.inner.state.lock().remote
    }

    /// Returns `true` while a reader thread is receiving frames. Turns `false` once the
    /// remote closes the stream or a read fails, even though the device is still
    /// [`LinkState::Up`]; scheduling a new start then reconnects.
    pub fn is_receiving(&self) -> bool {
        self.inner.reader.lock().as_ref().is_some_and(|reader| !reader.is_finished())
    }

    /// Where the device is in its lifecycle.
    pub fn link_state(&self) -> LinkState {
        self.inner.state.lock().link_state
    }

    /// Receive and transmit counters.
    pub fn stats(&self) -> &DeviceStats {
        &self.inner.stats
    }

    /// Number of received frames waiting for dispatch.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Number of received frames dropped because the queue was full.
    pub fn queue_drops(&self) -> u64 {
        self.inner.queue.dropped()
    }

    /// When the pending start fires, if one is pending.
    pub fn pending_start(&self) -> Option<SimTime> {
        let id = self.inner.state.lock().start_event?;
        self.inner.sim.scheduled_at(id)
    }

    /// When the pending stop fires, if one is pending.
    pub fn pending_stop(&self) -> Option<SimTime> {
        let id = self.inner.state.lock().stop_event?;
        self.inner.sim.scheduled_at(id)
    }

    /// Tears the device down: stops it, cancels pending lifecycle events and drops the
    /// receive and link callbacks, which may hold handles to this device.
    pub fn dispose(&self) {
        self.stop_device();

        let callbacks = {
            let mut state = self.inner.state.lock();
            (state.rx.take(), state.promisc_rx.take(), std::mem::take(&mut state.link_callbacks))
        };

        self.inner.discard_queued();
        drop(callbacks);
    }

    fn downgrade(&self) -> Weak<Inner<T>> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner<T>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn start_device(&self) {
        let (remote, node) = {
            let state = self.inner.state.lock();
            (state.remote, state.node)
        };

        let span = info_span!("device", ?node, ?remote);
        let _enter = span.enter();

        if self.inner.reader_exited() {
            warn!("reader exited, reconnecting");
            self.inner.shutdown_reader();
        } else if self.inner.reader.lock().is_some() {
            debug!("device already running");
            return;
        }

        self.set_link_state(LinkState::Starting);

        match self.try_start(remote, node) {
            Ok(()) => {
                let callbacks = {
                    let mut state = self.inner.state.lock();
                    state.link_up = true;
                    state.link_state = LinkState::Up;
                    state.link_callbacks.clone()
                };

                info!("device up");
                for callback in callbacks {
                    callback();
                }
            }
            Err(e) => {
                error!(?e, "failed to start device");

                let callbacks = {
                    let mut state = self.inner.state.lock();
                    state.link_state = LinkState::Unconfigured;
                    if std::mem::replace(&mut state.link_up, false) {
                        state.link_callbacks.clone()
                    } else {
                        Vec::new()
                    }
                };

                for callback in callbacks {
                    callback();
                }
            }
        }
    }

    fn try_start(
        &self,
        remote: Option<RemoteEndpoint>,
        node: Option<NodeId>,
    ) -> Result<(), StartError> {
        let remote = remote.ok_or(StartError::NoRemote)?;
        if !remote.is_valid() {
            return Err(StartError::InvalidRemote(remote));
        }

        let node = node.ok_or(StartError::NotAttached)?;

        let client = self.inner.transport.client(remote);
        let mut reader = FrameReader::new(client, self.inner.read_buffer_size);

        let queue = Arc::clone(&self.inner.queue);
        let sim = self.inner.sim.clone();
        let weak = self.downgrade();
        let epoch = self.inner.epoch.load(Ordering::Acquire);

        // Runs on the reader thread. Never upgrades `weak` there, so the device can't be
        // dropped from the reader thread.
        reader.start(move |frame: Frame| {
            if !queue.enqueue(frame) {
                return;
            }

            let weak = weak.clone();
            sim.schedule_with_context(node, Duration::ZERO, move || {
                if let Some(device) = Self::upgrade(&weak) {
                    device.forward_up(epoch);
                }
            });
        })?;

        *self.inner.reader.lock() = Some(reader);

        Ok(())
    }

    pub(crate) fn stop_device(&self) {
        let (events, node) = {
            let mut state = self.inner.state.lock();
            let events = [state.start_event.take(), state.stop_event.take()];
            (events, state.node)
        };

        for id in events.into_iter().flatten() {
            debug!(?id, "cancelling pending lifecycle event");
            self.inner.sim.cancel(id);
        }

        {
            let mut state = self.inner.state.lock();
            if state.link_state != LinkState::Up {
                return;
            }
            state.link_state = LinkState::Stopping;
        }

        let span = info_span!("device", ?node);
        let _enter = span.enter();

        self.inner.shutdown_reader();

        let callbacks = {
            let mut state = self.inner.state.lock();
            state.link_state = LinkState::Down;

            if self.inner.link_down_on_stop && state.link_up {
                state.link_up = false;
                state.link_callbacks.clone()
            } else {
                Vec::new()
            }
        };

        info!("device down");
        for callback in callbacks {
            callback();
        }
    }

    fn set_link_state(&self, link_state: LinkState) {
        let mut state = self.inner.state.lock();
        if state.link_state != link_state {
            debug!(from = %state.link_state, to = %link_state, "link state change");
            state.link_state = link_state;
        }
    }
}
