//! The capability surface a simulated network interface exposes to the protocol stack of its
//! node.

use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use bytes::Bytes;
use remnet_sim::Context;
use remnet_wire::{MacAddr, PacketType, BROADCAST};

use crate::SendError;

/// Identifies a simulated node. Events run on behalf of a node carry its id as their context.
pub type NodeId = Context;

/// Receives frames addressed to the device or broadcast: `(device, payload, protocol, source)`.
pub type ReceiveCallback = Arc<dyn Fn(&dyn NetDevice, Bytes, u16, MacAddr) + Send + Sync>;

/// Receives every classified frame:
/// `(device, payload, protocol, source, destination, packet type)`.
pub type PromiscReceiveCallback =
    Arc<dyn Fn(&dyn NetDevice, Bytes, u16, MacAddr, MacAddr, PacketType) + Send + Sync>;

/// Invoked whenever the link goes up or down.
pub type LinkChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// The interface a node's protocol stack drives a network device through.
pub trait NetDevice: Send + Sync {
    /// The interface index on the node.
    fn if_index(&self) -> u32;

    /// Sets the interface index.
    fn set_if_index(&self, index: u32);

    /// The device's own MAC address.
    fn address(&self) -> MacAddr;

    /// Sets the MAC address.
    fn set_address(&self, address: MacAddr);

    /// The largest packet, header included, the device sends.
    fn mtu(&self) -> u16;

    /// Sets the MTU, returning whether the device accepted it.
    fn set_mtu(&self, mtu: u16) -> bool;

    /// Whether the link is up. Sends fail while it is down.
    fn is_link_up(&self) -> bool;

    /// Registers a callback run whenever the link goes up or down.
    fn add_link_change_callback(&self, callback: LinkChangeCallback);

    /// Whether the device supports broadcast.
    fn is_broadcast(&self) -> bool;

    fn set_is_broadcast(&self, broadcast: bool);

    /// The broadcast address.
    fn broadcast(&self) -> MacAddr {
        BROADCAST
    }

    /// Whether multicast frames are delivered rather than dropped.
    fn is_multicast(&self) -> bool;

    /// Enables or disables delivery of multicast frames.
    fn set_is_multicast(&self, multicast: bool);

    /// The MAC address an IPv4 multicast group maps to.
    fn multicast_v4(&self, group: Ipv4Addr) -> MacAddr {
        remnet_wire::multicast_v4(group)
    }

    /// The MAC address an IPv6 multicast address maps to.
    fn multicast_v6(&self, addr: Ipv6Addr) -> MacAddr {
        remnet_wire::multicast_v6(addr)
    }

    fn is_point_to_point(&self) -> bool {
        false
    }

    fn is_bridge(&self) -> bool {
        false
    }

    /// The node the device is attached to.
    fn node(&self) -> Option<NodeId>;

    /// Attaches the device to a node. Frames are dispatched in its context.
    fn set_node(&self, node: NodeId);

    fn needs_arp(&self) -> bool {
        true
    }

    /// Replaces the callback receiving frames meant for this host.
    fn set_receive_callback(&self, callback: ReceiveCallback);

    /// Replaces the callback receiving every frame, whoever it is for.
    fn set_promisc_receive_callback(&self, callback: PromiscReceiveCallback);

    fn supports_send_from(&self) -> bool {
        true
    }

    /// Sends `packet` from the device's own address.
    fn send(&self, packet: Bytes, destination: MacAddr, protocol: u16) -> Result<(), SendError> {
        self.send_from(packet, self.address(), destination, protocol)
    }

    /// Sends `packet` with an explicit source address.
    fn send_from(
        &self,
        packet: Bytes,
        source: MacAddr,
        destination: MacAddr,
        protocol: u16,
    ) -> Result<(), SendError>;
}
