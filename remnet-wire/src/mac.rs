use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;

/// The all-ones broadcast address. A device configured with it has no address of its own yet.
pub const BROADCAST: MacAddr = MacAddr(0xff, 0xff, 0xff, 0xff, 0xff, 0xff);

/// Helpers on [`MacAddr`] the link layer needs.
pub trait MacAddrExt {
    /// Returns the address octets in wire order.
    fn bytes(&self) -> [u8; 6];

    /// Returns `true` if the address is one an IP multicast group maps to: `01:00:5e` with the
    /// top bit of the fourth octet clear (RFC 1112), or `33:33` (RFC 2464).
    ///
    /// Addresses that merely carry the individual/group bit, broadcast included, are not
    /// multicast by this rule.
    fn is_multicast(&self) -> bool;
}

impl MacAddrExt for MacAddr {
    #[inline]
    fn bytes(&self) -> [u8; 6] {
        [self.0, self.1, self.2, self.3, self.4, self.5]
    }

    #[inline]
    fn is_multicast(&self) -> bool {
        matches!((self.0, self.1, self.2, self.3), (0x01, 0x00, 0x5e, b) if b & 0x80 == 0)
            || (self.0, self.1) == (0x33, 0x33)
    }
}

/// Maps an IPv4 multicast group to its Ethernet group address (RFC 1112): the `01:00:5e`
/// prefix followed by the low 23 bits of the group.
pub fn multicast_v4(group: Ipv4Addr) -> MacAddr {
    let [_, b, c, d] = group.octets();
    MacAddr(0x01, 0x00, 0x5e, b & 0x7f, c, d)
}

/// Maps an IPv6 multicast address to its Ethernet group address (RFC 2464): `33:33` followed
/// by the last four octets of the address.
pub fn multicast_v6(addr: Ipv6Addr) -> MacAddr {
    let o = addr.octets();
    MacAddr(0x33, 0x33, o[12], o[13], o[14], o[15])
}
