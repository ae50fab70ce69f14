use std::fmt;

use pnet::util::MacAddr;

use crate::mac::{MacAddrExt, BROADCAST};

/// Who a received frame is addressed to, from the point of view of the receiving device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Addressed to this device.
    Host,
    /// Addressed to every station on the link.
    Broadcast,
    /// Addressed to a group of stations.
    Multicast,
    /// Addressed to some other station; only promiscuous listeners see it.
    OtherHost,
}

impl PacketType {
    /// Returns `true` if the frame should be delivered to the regular (non-promiscuous)
    /// receive path.
    #[inline]
    pub fn is_for_us(self) -> bool {
        matches!(self, Self::Host | Self::Broadcast)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Host => "host",
            Self::Broadcast => "broadcast",
            Self::Multicast => "multicast",
            Self::OtherHost => "other-host",
        };
        f.write_str(s)
    }
}

/// Classifies `destination` relative to the device address `own`.
///
/// Broadcast wins over an exact match, so a device still carrying the broadcast sentinel as
/// its own address classifies broadcast frames as [`PacketType::Broadcast`]. Only IP multicast
/// addresses (see [`MacAddrExt::is_multicast`]) classify as [`PacketType::Multicast`]; any other
/// foreign address is [`PacketType::OtherHost`], whatever its group bit says.
pub fn classify(destination: MacAddr, own: MacAddr) -> PacketType {
    if destination == BROADCAST {
        PacketType::Broadcast
    } else if destination == own {
        PacketType::Host
    } else if destination.is_multicast() {
        PacketType::Multicast
    } else {
        PacketType::OtherHost
    }
}
