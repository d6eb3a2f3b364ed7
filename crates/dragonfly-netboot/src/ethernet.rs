//! Ethernet II framing

use crate::session::MacAddr;
use bytes::BufMut;

/// EtherType for IPv4
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// EtherType for ARP
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// Ethernet header length
pub const HEADER_LEN: usize = 14;

/// Minimum frame length without FCS; shorter frames are zero-padded
pub const MIN_FRAME_LEN: usize = 60;

/// Maximum frame length without FCS (MTU 1500 + header)
pub const MAX_FRAME_LEN: usize = 1514;

/// Ethernet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
}

impl EthernetHeader {
    /// Parse the header at the start of a frame
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < HEADER_LEN {
            return None;
        }
        let mut dst = [0u8; 6];
        let mut src = [0u8; 6];
        dst.copy_from_slice(&frame[0..6]);
        src.copy_from_slice(&frame[6..12]);
        Some(Self {
            dst: MacAddr(dst),
            src: MacAddr(src),
            ethertype: u16::from_be_bytes([frame[12], frame[13]]),
        })
    }

    /// Append the encoded header
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.dst.0);
        buf.put_slice(&self.src.0);
        buf.put_u16(self.ethertype);
    }
}

/// Pad a frame up to the Ethernet minimum
pub fn pad_frame(frame: &mut Vec<u8>) {
    if frame.len() < MIN_FRAME_LEN {
        frame.resize(MIN_FRAME_LEN, 0);
    }
}
