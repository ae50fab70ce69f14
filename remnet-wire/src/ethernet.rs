use bytes::{Buf, BufMut, Bytes, BytesMut};
use pnet::{packet::ethernet::EthernetPacket, util::MacAddr};
use thiserror::Error;

use crate::mac::MacAddrExt;

/// Destination address, source address and the 2-byte length/type field.
pub const HEADER_LEN: usize = 14;

/// Why a frame could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The frame is shorter than the header.
    #[error("truncated ethernet frame: {len} bytes, header needs 14")]
    Truncated { len: usize },
}

/// Result of decoding a frame.
pub type Result<T> = std::result::Result<T, Error>;

/// An Ethernet II header. The `ethertype` field carries either a protocol number or, for
/// 802.3 frames, the payload length; it is passed through untouched in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddr,
    pub source: MacAddr,
    /// Protocol number, or payload length for 802.3 frames.
    pub ethertype: u16,
}

impl EthernetHeader {
    pub fn new(source: MacAddr, destination: MacAddr, ethertype: u16) -> Self {
        Self { destination, source, ethertype }
    }

    /// Returns the length of the header in bytes.
    #[inline]
    pub const fn len() -> usize {
        HEADER_LEN
    }

    /// Parses the header at the front of `frame` without consuming anything.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        let packet = EthernetPacket::new(frame).ok_or(Error::Truncated { len: frame.len() })?;

        Ok(Self {
            destination: packet.get_destination(),
            source: packet.get_source(),
            ethertype: packet.get_ethertype().0,
        })
    }

    /// Removes the header from the front of `frame`, leaving only the payload behind. On error
    /// the frame is left untouched.
    pub fn strip(frame: &mut Bytes) -> Result<Self> {
        let header = Self::parse(frame)?;
        frame.advance(HEADER_LEN);

        Ok(header)
    }

    /// Appends the header followed by `payload` to `dst`.
    pub fn encode(&self, payload: &[u8], dst: &mut BytesMut) {
        dst.reserve(HEADER_LEN + payload.len());

        dst.put_slice(&self.destination.bytes());
        dst.put_slice(&self.source.bytes());
        dst.put_u16(self.ethertype);
        dst.put_slice(payload);
    }

    /// Serializes the header and `payload` into one contiguous frame.
    pub fn to_frame(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
        self.encode(payload, &mut buf);
        buf.freeze()
    }
}
