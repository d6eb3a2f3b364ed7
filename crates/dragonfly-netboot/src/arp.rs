//! ARP responder
//!
//! The client never resolves addresses itself (the server MAC comes from the
//! BOOTP reply), but once it owns an IP it must answer the server's ARP
//! requests or the TFTP server will never find it.

use crate::ethernet::{self, EthernetHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4};
use crate::link::LinkLayer;
use crate::session::{MacAddr, SessionContext};
use bytes::BufMut;
use std::net::Ipv4Addr;
use tracing::{debug, warn};

/// Hardware type for Ethernet
pub const HTYPE_ETHERNET: u16 = 1;

/// ARP packet length for Ethernet/IPv4
pub const PACKET_LEN: usize = 28;

/// ARP operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

/// Ethernet/IPv4 ARP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub op: ArpOp,
    pub sender_hw: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_hw: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// Parse an ARP packet, accepting only Ethernet/IPv4 address formats
    pub fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() < PACKET_LEN {
            return None;
        }
        let htype = u16::from_be_bytes([packet[0], packet[1]]);
        let ptype = u16::from_be_bytes([packet[2], packet[3]]);
        if htype != HTYPE_ETHERNET || ptype != ETHERTYPE_IPV4 || packet[4] != 6 || packet[5] != 4 {
            return None;
        }
        let op = match u16::from_be_bytes([packet[6], packet[7]]) {
            1 => ArpOp::Request,
            2 => ArpOp::Reply,
            _ => return None,
        };

        let mac_at = |at: usize| {
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&packet[at..at + 6]);
            MacAddr(mac)
        };
        let ip_at = |at: usize| Ipv4Addr::new(packet[at], packet[at + 1], packet[at + 2], packet[at + 3]);

        Some(Self {
            op,
            sender_hw: mac_at(8),
            sender_ip: ip_at(14),
            target_hw: mac_at(18),
            target_ip: ip_at(24),
        })
    }

    /// Append the encoded packet
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16(HTYPE_ETHERNET);
        buf.put_u16(ETHERTYPE_IPV4);
        buf.put_u8(6);
        buf.put_u8(4);
        buf.put_u16(self.op as u16);
        buf.put_slice(&self.sender_hw.0);
        buf.put_slice(&self.sender_ip.octets());
        buf.put_slice(&self.target_hw.0);
        buf.put_slice(&self.target_ip.octets());
    }

    /// Build the reply to this request on behalf of `session`
    ///
    /// Returns None unless this is a request for our own, known, IP.
    pub fn reply_for(&self, session: &SessionContext) -> Option<ArpPacket> {
        if self.op != ArpOp::Request || !session.has_ip() || self.target_ip != session.my_ip {
            return None;
        }
        Some(ArpPacket {
            op: ArpOp::Reply,
            sender_hw: session.my_hw(),
            sender_ip: session.my_ip,
            target_hw: self.sender_hw,
            target_ip: self.sender_ip,
        })
    }
}

/// Answer an ARP frame if it asks for our address
///
/// `payload` is the frame body after the Ethernet header. Returns true when a
/// reply was transmitted. Send failures are logged and swallowed.
pub fn respond<L: LinkLayer>(payload: &[u8], session: &SessionContext, link: &mut L) -> bool {
    let Some(request) = ArpPacket::parse(payload) else {
        return false;
    };
    let Some(reply) = request.reply_for(session) else {
        return false;
    };

    let mut frame = Vec::with_capacity(ethernet::MIN_FRAME_LEN);
    EthernetHeader {
        dst: request.sender_hw,
        src: session.my_hw(),
        ethertype: ETHERTYPE_ARP,
    }
    .encode(&mut frame);
    reply.encode(&mut frame);
    ethernet::pad_frame(&mut frame);

    match link.send(&frame) {
        Ok(()) => {
            debug!(requester = %request.sender_ip, "Answered ARP request");
            true
        }
        Err(e) => {
            warn!(error = %e, requester = %request.sender_ip, "Failed to send ARP reply");
            false
        }
    }
}
