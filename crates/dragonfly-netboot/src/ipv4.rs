//! IPv4 header handling
//!
//! Only what a boot client needs: a 20-byte header without options on
//! send, and a header with optional options on receive. Fragments are not
//! reassembled.

use crate::checksum::{compute_ip_checksum, header_words};
use bytes::BufMut;
use std::net::Ipv4Addr;

/// Length of a header without options
pub const HEADER_LEN: usize = 20;

/// IP protocol number for UDP
pub const PROTO_UDP: u8 = 17;

/// TTL used on every outgoing packet
pub const DEFAULT_TTL: u8 = 255;

const FLAG_MORE_FRAGMENTS: u16 = 0x2000;
const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;

/// Decoded IPv4 header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    /// Header length in bytes (IHL * 4)
    pub header_len: usize,
    /// Total packet length from the header
    pub total_len: u16,
    pub identification: u16,
    /// Flags and fragment offset word
    pub flags_fragment: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Ipv4Header {
    /// Create a header for an outgoing packet carrying `payload_len` bytes
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, payload_len: usize, id: u16) -> Self {
        Self {
            header_len: HEADER_LEN,
            total_len: (HEADER_LEN + payload_len) as u16,
            identification: id,
            flags_fragment: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            src,
            dst,
        }
    }

    /// Parse a header, rejecting anything that is not a plausible IPv4 header
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() < HEADER_LEN {
            return None;
        }
        let version = packet[0] >> 4;
        let header_len = ((packet[0] & 0x0F) as usize) * 4;
        if version != 4 || header_len < HEADER_LEN || packet.len() < header_len {
            return None;
        }
        let total_len = u16::from_be_bytes([packet[2], packet[3]]);
        if (total_len as usize) < header_len {
            return None;
        }

        Some(Self {
            header_len,
            total_len,
            identification: u16::from_be_bytes([packet[4], packet[5]]),
            flags_fragment: u16::from_be_bytes([packet[6], packet[7]]),
            ttl: packet[8],
            protocol: packet[9],
            checksum: u16::from_be_bytes([packet[10], packet[11]]),
            src: Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15]),
            dst: Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19]),
        })
    }

    /// Check if this packet is a fragment of a larger datagram
    pub fn is_fragment(&self) -> bool {
        self.flags_fragment & FLAG_MORE_FRAGMENTS != 0
            || self.flags_fragment & FRAGMENT_OFFSET_MASK != 0
    }

    /// Encode the 20-byte header, computing its checksum
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        {
            let mut buf = &mut header[..];
            buf.put_u8(0x45);
            buf.put_u8(0); // TOS
            buf.put_u16(self.total_len);
            buf.put_u16(self.identification);
            buf.put_u16(self.flags_fragment);
            buf.put_u8(self.ttl);
            buf.put_u8(self.protocol);
            buf.put_u16(0); // checksum placeholder
            buf.put_slice(&self.src.octets());
            buf.put_slice(&self.dst.octets());
        }
        let checksum = compute_ip_checksum(&header_words(&header));
        header[10..12].copy_from_slice(&checksum.to_be_bytes());
        header
    }
}
