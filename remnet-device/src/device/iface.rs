use bytes::Bytes;
use remnet_transport::Transport;
use remnet_wire::MacAddr;

use super::{RemoteNetDevice, SendError};
use crate::net_device::{
    LinkChangeCallback, NetDevice, NodeId, PromiscReceiveCallback, ReceiveCallback,
};

impl<T: Transport> NetDevice for RemoteNetDevice<T> {
    fn if_index(&self) -> u32 {
        self.inner.state.lock().if_index
    }

    fn set_if_index(&self, index: u32) {
        self.inner.state.lock().if_index = index;
    }

    fn address(&self) -> MacAddr {
        self.inner.state.lock().address
    }

    fn set_address(&self, address: MacAddr) {
        self.inner.state.lock().address = address;
    }

    fn mtu(&self) -> u16 {
        self.inner.state.lock().mtu
    }

    fn set_mtu(&self, mtu: u16) -> bool {
        self.inner.state.lock().mtu = mtu;
        true
    }

    fn is_link_up(&self) -> bool {
        self.inner.state.lock().link_up
    }

    fn add_link_change_callback(&self, callback: LinkChangeCallback) {
        self.inner.state.lock().link_callbacks.push(callback);
    }

    fn is_broadcast(&self) -> bool {
        self.inner.state.lock().is_broadcast
    }

    fn set_is_broadcast(&self, broadcast: bool) {
        self.inner.state.lock().is_broadcast = broadcast;
    }

    fn is_multicast(&self) -> bool {
        self.inner.state.lock().is_multicast
    }

    fn set_is_multicast(&self, multicast: bool) {
        self.inner.state.lock().is_multicast = multicast;
    }

    fn node(&self) -> Option<NodeId> {
        self.inner.state.lock().node
    }

    fn set_node(&self, node: NodeId) {
        self.inner.state.lock().node = Some(node);
    }

    fn set_receive_callback(&self, callback: ReceiveCallback) {
        self.inner.state.lock().rx = Some(callback);
    }

    fn set_promisc_receive_callback(&self, callback: PromiscReceiveCallback) {
        self.inner.state.lock().promisc_rx = Some(callback);
    }

    fn send_from(
        &self,
        packet: Bytes,
        source: MacAddr,
        destination: MacAddr,
        protocol: u16,
    ) -> Result<(), SendError> {
        self.transmit(packet, source, destination, protocol)
    }
}
