use std::time::Duration;

use remnet_transport::RemoteEndpoint;
use remnet_wire::{MacAddr, BROADCAST};

use crate::{queue::DEFAULT_QUEUE_CAPACITY, reader::DEFAULT_READ_BUFFER_SIZE};

/// The MTU a device starts with.
pub const DEFAULT_MTU: u16 = 1400;

/// Construction parameters of a [`RemoteNetDevice`](crate::RemoteNetDevice).
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// The device's MAC address. The broadcast address means unconfigured.
    pub address: MacAddr,
    /// Delay after construction at which the device starts.
    pub start: Duration,
    /// Delay after construction at which the device stops, if ever.
    pub stop: Option<Duration>,
    /// The remote endpoint to connect to. Can also be set later with
    /// [`RemoteNetDevice::set_remote`](crate::RemoteNetDevice::set_remote).
    pub remote: Option<RemoteEndpoint>,
    /// Maximum number of received frames waiting for dispatch. Frames arriving at a full
    /// queue are dropped.
    pub rx_queue_size: usize,
    /// Largest packet, Ethernet header included, the device sends.
    pub mtu: u16,
    /// Size of the buffer of every transport read. Must not be zero: a device configured with
    /// an empty buffer fails to start.
    pub read_buffer_size: usize,
    /// Whether stopping the device also takes the link down.
    pub link_down_on_stop: bool,
}

impl DeviceConfig {
    /// Sets the MAC address.
    pub fn with_address(mut self, address: MacAddr) -> Self {
        self.address = address;
        self
    }

    /// Sets the start delay.
    pub fn with_start(mut self, at: Duration) -> Self {
        self.start = at;
        self
    }

    /// Stops the device `at` after construction.
    pub fn with_stop(mut self, at: Duration) -> Self {
        self.stop = Some(at);
        self
    }

    /// Sets the remote endpoint.
    pub fn with_remote(mut self, remote: RemoteEndpoint) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Sets the receive queue capacity.
    pub fn with_rx_queue_size(mut self, size: usize) -> Self {
        self.rx_queue_size = size;
        self
    }

    /// Sets the MTU.
    pub fn with_mtu(mut self, mtu: u16) -> Self {
        self.mtu = mtu;
        self
    }

    /// Sets the per-read buffer size.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Sets whether a stop takes the link down.
    pub fn with_link_down_on_stop(mut self, link_down: bool) -> Self {
        self.link_down_on_stop = link_down;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: BROADCAST,
            start: Duration::ZERO,
            stop: None,
            remote: None,
            rx_queue_size: DEFAULT_QUEUE_CAPACITY,
            mtu: DEFAULT_MTU,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            link_down_on_stop: false,
        }
    }
}
