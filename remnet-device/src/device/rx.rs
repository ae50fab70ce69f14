use std::sync::atomic::Ordering;

use bytes::Bytes;
use remnet_transport::Transport;
use remnet_wire::{classify, EthernetHeader, PacketType};
use tracing::{debug, error, trace, warn};

use super::RemoteNetDevice;
use crate::NetDevice;

impl<T: Transport> RemoteNetDevice<T> {
    /// Delivers the oldest queued frame. Posted once per enqueued frame by the reader; `epoch`
    /// is the stop epoch the reader was started in.
    pub(crate) fn forward_up(&self, epoch: u64) {
        if epoch != self.inner.epoch.load(Ordering::Acquire) {
            trace!(epoch, "skipping dispatch of a stopped reader");
            return;
        }

        let Some(frame) = self.inner.queue.dequeue() else {
            error!("dispatch posted but the receive queue is empty");
            return;
        };

        self.dispatch(frame.into_bytes());
    }

    fn dispatch(&self, mut frame: Bytes) {
        if frame.is_empty() {
            error!("empty frame in receive queue");
            return;
        }

        let len = frame.len();
        let header = match EthernetHeader::strip(&mut frame) {
            Ok(header) => header,
            Err(e) => {
                self.inner.stats.increment_malformed();
                warn!(%e, "dropping malformed frame");
                return;
            }
        };

        let (address, is_multicast, rx, promisc_rx) = {
            let state = self.inner.state.lock();
            (state.address, state.is_multicast, state.rx.clone(), state.promisc_rx.clone())
        };

        let packet_type = classify(header.destination, address);
        if packet_type == PacketType::Multicast && !is_multicast {
            self.inner.stats.increment_multicast_dropped();
            debug!(destination = %header.destination, "multicast disabled, dropping frame");
            return;
        }

        self.inner.stats.increment_rx(len);
        trace!(
            source = %header.source,
            destination = %header.destination,
            protocol = header.ethertype,
            %packet_type,
            len,
            "received frame"
        );

        let device: &dyn NetDevice = self;

        if let Some(promisc_rx) = promisc_rx {
            promisc_rx(
                device,
                frame.clone(),
                header.ethertype,
                header.source,
                header.destination,
                packet_type,
            );
        }

        if packet_type.is_for_us() {
            if let Some(rx) = rx {
                rx(device, frame, header.ethertype, header.source);
            }
        }
    }
}
