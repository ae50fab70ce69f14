use bytes::Bytes;
use remnet_transport::Transport;
use remnet_wire::{EthernetHeader, MacAddr};
use tracing::{debug, error, trace};

use super::{RemoteNetDevice, SendError};

impl<T: Transport> RemoteNetDevice<T> {
    /// Frames `packet` and writes it to the transport.
    ///
    /// Partial writes are not retried. Writing before the client has connected writes nothing
    /// and still succeeds.
    pub(crate) fn transmit(
        &self,
        packet: Bytes,
        source: MacAddr,
        destination: MacAddr,
        protocol: u16,
    ) -> Result<(), SendError> {
        let (link_up, mtu) = {
            let state = self.inner.state.lock();
            (state.link_up, state.mtu)
        };

        if !link_up {
            debug!(%destination, "link down, not sending");
            return Err(SendError::LinkDown);
        }

        let size = EthernetHeader::len() + packet.len();
        if size > usize::from(mtu) {
            return Err(SendError::MtuExceeded { size, mtu });
        }

        let frame = EthernetHeader::new(source, destination, protocol).to_frame(&packet);

        let written = match self.inner.reader.lock().as_ref() {
            Some(reader) => reader.write_raw(&frame),
            None => {
                error!(len = frame.len(), "device not running, frame not written");
                Ok(0)
            }
        };

        match written {
            Ok(n) => {
                if n > 0 {
                    self.inner.stats.increment_tx(n);
                }
                trace!(%source, %destination, protocol, len = n, "sent frame");
                Ok(())
            }
            Err(e) => {
                error!(?e, "error writing to client");
                Err(SendError::Io(e))
            }
        }
    }
}
