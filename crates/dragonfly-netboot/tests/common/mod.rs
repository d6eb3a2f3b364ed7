//! Scripted link and clock shared by the integration tests

#![allow(dead_code)]

use dragonfly_netboot::arp::{ArpOp, ArpPacket};
use dragonfly_netboot::ethernet::{self, EthernetHeader, ETHERTYPE_ARP, ETHERTYPE_IPV4};
use dragonfly_netboot::ipv4::Ipv4Header;
use dragonfly_netboot::tftp::TftpPacket;
use dragonfly_netboot::udp::{build_frame, Endpoint, UdpHeader};
use dragonfly_netboot::{Clock, LinkError, LinkLayer, MacAddr, SessionContext, UdpTransport};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

pub const CLIENT_MAC: MacAddr = MacAddr([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
pub const SERVER_MAC: MacAddr = MacAddr([0x52, 0x54, 0x00, 0xab, 0xcd, 0xef]);
pub const CLIENT_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 50);
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// Port the fake TFTP server answers from
pub const SERVER_TID: u16 = 3000;

/// How far the clock moves when the link times out
pub const LINK_POLL: Duration = Duration::from_secs(1);

pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(4);

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<Duration>>,
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// A UDP datagram the client put on the wire
#[derive(Debug, Clone)]
pub struct SentDatagram {
    pub dst_hw: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub identification: u16,
    pub src_port: u16,
    pub dst_port: u16,
    pub payload: Vec<u8>,
}

impl SentDatagram {
    pub fn tftp(&self) -> TftpPacket {
        TftpPacket::parse(&self.payload).unwrap()
    }
}

/// Decode an outgoing IPv4/UDP frame
pub fn parse_datagram(frame: &[u8]) -> Option<SentDatagram> {
    let eth = EthernetHeader::parse(frame)?;
    if eth.ethertype != ETHERTYPE_IPV4 {
        return None;
    }
    let ip = Ipv4Header::parse(&frame[ethernet::HEADER_LEN..])?;
    let segment = &frame[ethernet::HEADER_LEN + ip.header_len..];
    let udp = UdpHeader::parse(segment)?;
    Some(SentDatagram {
        dst_hw: eth.dst,
        src_ip: ip.src,
        dst_ip: ip.dst,
        identification: ip.identification,
        src_port: udp.src_port,
        dst_port: udp.dst_port,
        payload: segment[8..udp.length as usize].to_vec(),
    })
}

type Responder = Box<dyn FnMut(&SentDatagram) -> Vec<Vec<u8>>>;

/// Link whose peer is a closure
///
/// Every UDP datagram sent is handed to the responder, and the frames it
/// returns are queued for receive. An empty queue times out and moves the
/// clock forward by [`LINK_POLL`], unless a noise frame is set: then the
/// link keeps delivering that frame and moves the clock by its interval.
pub struct FakeLink {
    clock: MockClock,
    present: bool,
    init_error: Option<LinkError>,
    fail_sends: bool,
    send_attempts: usize,
    inbox: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    responder: Option<Responder>,
    noise: Option<(Vec<u8>, Duration)>,
    delivered: usize,
}

impl FakeLink {
    pub fn new(clock: MockClock) -> Self {
        Self {
            clock,
            present: true,
            init_error: None,
            fail_sends: false,
            send_attempts: 0,
            inbox: VecDeque::new(),
            sent: Vec::new(),
            responder: None,
            noise: None,
            delivered: 0,
        }
    }

    /// Deliver `frame` every `interval` whenever nothing else is queued
    pub fn with_noise(mut self, frame: Vec<u8>, interval: Duration) -> Self {
        self.noise = Some((frame, interval));
        self
    }

    pub fn with_responder(
        mut self,
        responder: impl FnMut(&SentDatagram) -> Vec<Vec<u8>> + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    pub fn failing_init(mut self, error: LinkError) -> Self {
        self.init_error = Some(error);
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.inbox.push_back(frame);
    }

    /// Frames handed to the receiver so far
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn send_attempts(&self) -> usize {
        self.send_attempts
    }

    /// Raw frames that were transmitted
    pub fn sent_frames(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// UDP datagrams that were transmitted, in order
    pub fn sent_datagrams(&self) -> Vec<SentDatagram> {
        self.sent.iter().filter_map(|f| parse_datagram(f)).collect()
    }

    /// ARP packets that were transmitted
    pub fn sent_arp(&self) -> Vec<ArpPacket> {
        self.sent
            .iter()
            .filter(|f| EthernetHeader::parse(f).map(|e| e.ethertype) == Some(ETHERTYPE_ARP))
            .filter_map(|f| ArpPacket::parse(&f[ethernet::HEADER_LEN..]))
            .collect()
    }
}

impl LinkLayer for FakeLink {
    fn probe(&mut self) -> bool {
        self.present
    }

    fn init(&mut self) -> Result<(), LinkError> {
        match self.init_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn hardware_address(&self) -> MacAddr {
        CLIENT_MAC
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.send_attempts += 1;
        if self.fail_sends {
            return Err(LinkError::SendError);
        }
        self.sent.push(frame.to_vec());

        if let (Some(responder), Some(datagram)) = (self.responder.as_mut(), parse_datagram(frame)) {
            self.inbox.extend(responder(&datagram));
        }
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let frame = match (self.inbox.pop_front(), &self.noise) {
            (Some(frame), _) => frame,
            (None, Some((frame, interval))) => {
                self.clock.advance(*interval);
                frame.clone()
            }
            (None, None) => {
                self.clock.advance(LINK_POLL);
                return Err(LinkError::Timeout);
            }
        };
        if frame.len() > buf.len() {
            return Err(LinkError::Overflow);
        }
        buf[..frame.len()].copy_from_slice(&frame);
        self.delivered += 1;
        Ok(frame.len())
    }
}

pub fn server(port: u16) -> Endpoint {
    Endpoint {
        hw: SERVER_MAC,
        ip: SERVER_IP,
        port,
    }
}

pub fn client(port: u16) -> Endpoint {
    Endpoint {
        hw: CLIENT_MAC,
        ip: CLIENT_IP,
        port,
    }
}

/// Transport for an unconfigured client
pub fn unbound_transport(link: FakeLink, clock: MockClock) -> UdpTransport<FakeLink, MockClock> {
    UdpTransport::new(link, clock, SessionContext::new(CLIENT_MAC), RECEIVE_TIMEOUT)
}

/// Transport for a client that already completed discovery
pub fn bound_transport(link: FakeLink, clock: MockClock) -> UdpTransport<FakeLink, MockClock> {
    let mut session = SessionContext::new(CLIENT_MAC);
    session.my_ip = CLIENT_IP;
    session.server_ip = SERVER_IP;
    session.server_hw = SERVER_MAC;
    UdpTransport::new(link, clock, session, RECEIVE_TIMEOUT)
}

/// TFTP DATA frame from the server's transfer port to `to_port`
pub fn data_frame(to_port: u16, block: u16, data: &[u8]) -> Vec<u8> {
    data_frame_from(SERVER_TID, to_port, block, data)
}

pub fn data_frame_from(from_port: u16, to_port: u16, block: u16, data: &[u8]) -> Vec<u8> {
    let payload = TftpPacket::data(block, data.to_vec()).encode();
    build_frame(server(from_port), client(to_port), &payload, 0)
}

/// Slice of `file` carried by 1-based `block`
pub fn block_of(file: &[u8], block: u16) -> &[u8] {
    let start = (block as usize - 1) * 512;
    let end = (start + 512).min(file.len());
    &file[start.min(file.len())..end]
}

/// Lock-step TFTP server for one file
pub fn tftp_server(file: Vec<u8>) -> impl FnMut(&SentDatagram) -> Vec<Vec<u8>> {
    let last_block = (file.len() / 512 + 1) as u16;
    move |sent| match TftpPacket::parse(&sent.payload) {
        Ok(TftpPacket::ReadRequest { .. }) => {
            vec![data_frame(sent.src_port, 1, block_of(&file, 1))]
        }
        Ok(TftpPacket::Ack { block }) if block < last_block => {
            vec![data_frame(sent.src_port, block + 1, block_of(&file, block + 1))]
        }
        _ => Vec::new(),
    }
}

/// ARP request from the server asking who has `target`
pub fn arp_request(target: Ipv4Addr) -> Vec<u8> {
    let mut frame = Vec::new();
    EthernetHeader {
        dst: MacAddr::BROADCAST,
        src: SERVER_MAC,
        ethertype: ETHERTYPE_ARP,
    }
    .encode(&mut frame);
    ArpPacket {
        op: ArpOp::Request,
        sender_hw: SERVER_MAC,
        sender_ip: SERVER_IP,
        target_hw: MacAddr::UNKNOWN,
        target_ip: target,
    }
    .encode(&mut frame);
    ethernet::pad_frame(&mut frame);
    frame
}

/// Deterministic file contents
pub fn test_file(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
