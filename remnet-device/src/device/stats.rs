use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of a [`RemoteNetDevice`](crate::RemoteNetDevice). Updated from the simulation
/// thread, readable from anywhere.
#[derive(Debug, Default)]
pub struct DeviceStats {
    /// Frames handed to the sinks
    rx_frames: AtomicU64,
    /// Bytes of the frames handed to the sinks, headers included
    rx_bytes: AtomicU64,
    tx_frames: AtomicU64,
    tx_bytes: AtomicU64,
    /// Frames too short to carry an Ethernet header
    malformed: AtomicU64,
    /// Multicast frames received while multicast is disabled
    multicast_dropped: AtomicU64,
    /// Queued frames thrown away by a stop or teardown
    discarded: AtomicU64,
}

impl DeviceStats {
    #[inline]
    pub(crate) fn increment_rx(&self, bytes: usize) {
        self.rx_frames.fetch_add(1, Ordering::Relaxed);
        self.rx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_tx(&self, bytes: usize) {
        self.tx_frames.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_multicast_dropped(&self) {
        self.multicast_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_discarded(&self, frames: usize) {
        self.discarded.fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Frames delivered to the receive callbacks.
    #[inline]
    pub fn rx_frames(&self) -> u64 {
        self.rx_frames.load(Ordering::Relaxed)
    }

    /// Bytes of delivered frames, headers included.
    #[inline]
    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    /// Frames written to the transport.
    #[inline]
    pub fn tx_frames(&self) -> u64 {
        self.tx_frames.load(Ordering::Relaxed)
    }

    /// Bytes written to the transport, headers included.
    #[inline]
    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes.load(Ordering::Relaxed)
    }

    /// Frames too short to carry an Ethernet header.
    #[inline]
    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Multicast frames dropped while multicast is disabled.
    #[inline]
    pub fn multicast_dropped(&self) -> u64 {
        self.multicast_dropped.load(Ordering::Relaxed)
    }

    /// Queued frames thrown away by a stop or teardown before dispatch.
    #[inline]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}
