//! UDP transport over raw Ethernet
//!
//! [`UdpTransport`] owns the link, the clock and the [`SessionContext`]. It
//! wraps payloads in UDP/IPv4/Ethernet headers addressed from the session,
//! and filters incoming frames down to the one datagram the caller is
//! waiting for. ARP requests seen while filtering are answered in passing.

use crate::arp;
use crate::error::{LinkError, TransportError};
use crate::ethernet::{self, EthernetHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4};
use crate::ipv4::{self, Ipv4Header, PROTO_UDP};
use crate::link::{Clock, LinkLayer};
use crate::session::{MacAddr, SessionContext};
use bytes::BufMut;
use std::net::Ipv4Addr;
use std::ops::Range;
use std::time::Duration;
use tracing::{debug, trace};

/// UDP header length
pub const HEADER_LEN: usize = 8;

/// Largest payload that fits a 1500-byte MTU without fragmentation
pub const MAX_PAYLOAD: usize = 1500 - ipv4::HEADER_LEN - HEADER_LEN;

const RX_BUFFER_SIZE: usize = 1536;

/// UDP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    /// Header plus payload length
    pub length: u16,
    pub checksum: u16,
}

impl UdpHeader {
    /// Parse the header at the start of a UDP segment
    pub fn parse(segment: &[u8]) -> Option<Self> {
        if segment.len() < HEADER_LEN {
            return None;
        }
        Some(Self {
            src_port: u16::from_be_bytes([segment[0], segment[1]]),
            dst_port: u16::from_be_bytes([segment[2], segment[3]]),
            length: u16::from_be_bytes([segment[4], segment[5]]),
            checksum: u16::from_be_bytes([segment[6], segment[7]]),
        })
    }

    /// Append the encoded header
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16(self.src_port);
        buf.put_u16(self.dst_port);
        buf.put_u16(self.length);
        buf.put_u16(self.checksum);
    }
}

/// One end of a UDP exchange as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub hw: MacAddr,
    pub ip: Ipv4Addr,
    pub port: u16,
}

/// Build a complete Ethernet frame carrying one UDP datagram
///
/// The UDP checksum is left at zero; peers on the boot network accept that.
pub fn build_frame(src: Endpoint, dst: Endpoint, payload: &[u8], ident: u16) -> Vec<u8> {
    let udp_len = HEADER_LEN + payload.len();
    let mut frame =
        Vec::with_capacity((ethernet::HEADER_LEN + ipv4::HEADER_LEN + udp_len).max(ethernet::MIN_FRAME_LEN));

    EthernetHeader {
        dst: dst.hw,
        src: src.hw,
        ethertype: ETHERTYPE_IPV4,
    }
    .encode(&mut frame);
    frame.put_slice(&Ipv4Header::new(src.ip, dst.ip, PROTO_UDP, udp_len, ident).to_bytes());
    UdpHeader {
        src_port: src.port,
        dst_port: dst.port,
        length: udp_len as u16,
        checksum: 0,
    }
    .encode(&mut frame);
    frame.put_slice(payload);
    ethernet::pad_frame(&mut frame);
    frame
}

/// A datagram accepted by [`UdpTransport::receive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datagram<'a> {
    /// Sender as seen in the Ethernet, IP and UDP headers
    pub src: Endpoint,
    /// UDP payload
    pub payload: &'a [u8],
}

impl Datagram<'_> {
    /// Payload length (UDP length minus header)
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

struct Accepted {
    src: Endpoint,
    payload: Range<usize>,
}

/// UDP transport bound to one session
pub struct UdpTransport<L, C> {
    link: L,
    clock: C,
    session: SessionContext,
    receive_timeout: Duration,
    rx_buf: Box<[u8]>,
    next_ident: u16,
}

impl<L: LinkLayer, C: Clock> UdpTransport<L, C> {
    /// Create a transport over an initialized link
    pub fn new(link: L, clock: C, session: SessionContext, receive_timeout: Duration) -> Self {
        Self {
            link,
            clock,
            session,
            receive_timeout,
            rx_buf: vec![0u8; RX_BUFFER_SIZE].into_boxed_slice(),
            next_ident: 0,
        }
    }

    /// Current session addressing
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Mutable session addressing, for discovery
    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    /// The clock driving deadlines and retry delays
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The underlying link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Send `payload` from `from_port` to the session's server at `to_port`
    pub fn send(&mut self, payload: &[u8], from_port: u16, to_port: u16) -> Result<(), TransportError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        let src = Endpoint {
            hw: self.session.my_hw(),
            ip: self.session.my_ip,
            port: from_port,
        };
        let dst = Endpoint {
            hw: self.session.server_hw,
            ip: self.session.server_ip,
            port: to_port,
        };
        let ident = self.next_ident;
        self.next_ident = self.next_ident.wrapping_add(1);

        let frame = build_frame(src, dst, payload, ident);
        trace!(len = payload.len(), from_port, to_port, dst = %dst.ip, "Sending UDP datagram");
        self.link.send(&frame).map_err(TransportError::Send)
    }

    /// Wait for a datagram addressed to `at_port`
    ///
    /// A `from_port` of zero accepts any source port. Frames that do not
    /// match are dropped until one does or the receive deadline passes.
    pub fn receive(&mut self, from_port: u16, at_port: u16) -> Result<Datagram<'_>, TransportError> {
        let deadline = self.clock.now() + self.receive_timeout;
        loop {
            let len = self
                .link
                .receive(&mut self.rx_buf)
                .map_err(TransportError::Recv)?
                .min(self.rx_buf.len());

            if let Some(accepted) = self.accept(len, from_port, at_port) {
                return Ok(Datagram {
                    src: accepted.src,
                    payload: &self.rx_buf[accepted.payload],
                });
            }

            if self.clock.now() >= deadline {
                debug!(from_port, at_port, "Receive deadline passed without a matching datagram");
                return Err(TransportError::Recv(LinkError::Timeout));
            }
        }
    }

    /// Run the receive filters over the first `len` bytes of the RX buffer
    fn accept(&mut self, len: usize, from_port: u16, at_port: u16) -> Option<Accepted> {
        let frame = &self.rx_buf[..len];
        let eth = EthernetHeader::parse(frame)?;

        match eth.ethertype {
            ETHERTYPE_ARP => {
                arp::respond(&frame[ethernet::HEADER_LEN..], &self.session, &mut self.link);
                return None;
            }
            ETHERTYPE_IPV4 => {}
            other => {
                trace!(ethertype = other, "Dropping non-IP frame");
                return None;
            }
        }

        let packet = &frame[ethernet::HEADER_LEN..];
        let ip = Ipv4Header::parse(packet)?;
        if ip.protocol != PROTO_UDP || ip.is_fragment() {
            return None;
        }
        if self.session.has_ip() && ip.dst != self.session.my_ip {
            trace!(dst = %ip.dst, "Dropping datagram for another host");
            return None;
        }
        if self.session.has_server() && ip.src != self.session.server_ip {
            trace!(src = %ip.src, "Dropping datagram from unexpected host");
            return None;
        }

        // Trailing Ethernet padding is not part of the IP packet
        let end = (ip.total_len as usize).min(packet.len());
        if end < ip.header_len + HEADER_LEN {
            return None;
        }
        let segment = &packet[ip.header_len..end];
        let udp = UdpHeader::parse(segment)?;
        if udp.dst_port != at_port || (from_port != 0 && udp.src_port != from_port) {
            trace!(src_port = udp.src_port, dst_port = udp.dst_port, "Dropping datagram for another port");
            return None;
        }
        let udp_len = udp.length as usize;
        if udp_len < HEADER_LEN || udp_len > segment.len() {
            return None;
        }

        let start = ethernet::HEADER_LEN + ip.header_len + HEADER_LEN;
        Some(Accepted {
            src: Endpoint {
                hw: eth.src,
                ip: ip.src,
                port: udp.src_port,
            },
            payload: start..start + udp_len - HEADER_LEN,
        })
    }
}

impl<L, C> std::fmt::Debug for UdpTransport<L, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("session", &self.session)
            .field("receive_timeout", &self.receive_timeout)
            .finish_non_exhaustive()
    }
}
