mod common;

use common::*;
use dragonfly_netboot::bootp::{OpCode, BOOTPC_PORT, BOOTPS_PORT};
use dragonfly_netboot::udp::{build_frame, Endpoint};
use dragonfly_netboot::{BootpClient, BootpError, BootpPacket, MacAddr};
use std::cell::Cell;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

/// BOOTREPLY frame answering `request`
fn reply_frame(request: &BootpPacket, xid: u32, file: &str) -> Vec<u8> {
    let mut reply = request.clone();
    reply.op = OpCode::BootReply;
    reply.xid = xid;
    reply.yiaddr = CLIENT_IP;
    reply.siaddr = SERVER_IP;
    reply.file = [0; 128];
    reply.file[..file.len()].copy_from_slice(file.as_bytes());

    let dst = Endpoint {
        hw: CLIENT_MAC,
        ip: Ipv4Addr::BROADCAST,
        port: BOOTPC_PORT,
    };
    build_frame(server(BOOTPS_PORT), dst, &reply.encode(), 0)
}

fn bootp_server(file: &'static str) -> impl FnMut(&SentDatagram) -> Vec<Vec<u8>> {
    move |sent| {
        let request = BootpPacket::parse(&sent.payload).unwrap();
        vec![reply_frame(&request, request.xid, file)]
    }
}

#[test]
fn test_discover_binds_session() {
    let clock = MockClock::new();
    let link = FakeLink::new(clock.clone()).with_responder(bootp_server("vmlinux"));
    let mut transport = unbound_transport(link, clock.clone());

    let filename = BootpClient::default().discover(&mut transport, None).unwrap();
    assert_eq!(filename, "vmlinux");

    let session = transport.session();
    assert_eq!(session.my_ip, CLIENT_IP);
    assert_eq!(session.server_ip, SERVER_IP);
    assert_eq!(session.server_hw, SERVER_MAC);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn test_request_is_broadcast() {
    let clock = MockClock::new();
    let link = FakeLink::new(clock.clone()).with_responder(bootp_server("vmlinux"));
    let mut transport = unbound_transport(link, clock);

    BootpClient::default()
        .discover(&mut transport, Some("vmlinux"))
        .unwrap();

    let sent = transport.link().sent_datagrams();
    assert_eq!(sent.len(), 1);
    let request = &sent[0];
    assert_eq!(request.dst_hw, MacAddr::BROADCAST);
    assert_eq!(request.src_ip, Ipv4Addr::UNSPECIFIED);
    assert_eq!(request.dst_ip, Ipv4Addr::BROADCAST);
    assert_eq!(request.src_port, BOOTPC_PORT);
    assert_eq!(request.dst_port, BOOTPS_PORT);
    assert_eq!(request.payload.len(), 300);

    let packet = BootpPacket::parse(&request.payload).unwrap();
    assert_eq!(packet.op, OpCode::BootRequest);
    assert_eq!(packet.client_mac(), CLIENT_MAC);
    assert_eq!(packet.file_name(), Some("vmlinux".to_string()));
}

#[test]
fn test_requested_filename_used_when_server_names_none() {
    let clock = MockClock::new();
    let link = FakeLink::new(clock.clone()).with_responder(bootp_server(""));
    let mut transport = unbound_transport(link, clock);

    let filename = BootpClient::default()
        .discover(&mut transport, Some("pxeboot.img"))
        .unwrap();
    assert_eq!(filename, "pxeboot.img");

    let link = FakeLink::new(MockClock::new()).with_responder(bootp_server(""));
    let mut transport = unbound_transport(link, MockClock::new());
    let filename = BootpClient::default().discover(&mut transport, None).unwrap();
    assert_eq!(filename, "");
}

#[test]
fn test_long_requested_filename_returned_as_sent() {
    let long_name = "k".repeat(200);
    let clock = MockClock::new();
    let link = FakeLink::new(clock.clone()).with_responder(bootp_server(""));
    let mut transport = unbound_transport(link, clock);

    let filename = BootpClient::default()
        .discover(&mut transport, Some(&long_name))
        .unwrap();
    assert_eq!(filename, "k".repeat(127));

    let sent = transport.link().sent_datagrams();
    let request = BootpPacket::parse(&sent[0].payload).unwrap();
    assert_eq!(request.file_name(), Some(filename));
}

#[test]
fn test_gives_up_after_five_attempts() {
    let clock = MockClock::new();
    let link = FakeLink::new(clock.clone());
    let mut transport = unbound_transport(link, clock.clone());

    let err = BootpClient::default().discover(&mut transport, None).unwrap_err();
    assert_eq!(err, BootpError::NoServer { attempts: 5 });

    assert_eq!(transport.link().sent_datagrams().len(), 5);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3); 4]);
    assert!(!transport.session().has_ip());
    assert!(!transport.session().has_server());
}

#[test]
fn test_stale_xid_is_discarded() {
    let clock = MockClock::new();
    let attempts = Rc::new(Cell::new(0));
    let seen = attempts.clone();
    let link = FakeLink::new(clock.clone()).with_responder(move |sent| {
        let request = BootpPacket::parse(&sent.payload).unwrap();
        seen.set(seen.get() + 1);
        let xid = if seen.get() == 1 {
            request.xid.wrapping_add(1)
        } else {
            request.xid
        };
        vec![reply_frame(&request, xid, "vmlinux")]
    });
    let mut transport = unbound_transport(link, clock.clone());

    let filename = BootpClient::default().discover(&mut transport, None).unwrap();
    assert_eq!(filename, "vmlinux");
    assert_eq!(attempts.get(), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3)]);
}

#[test]
fn test_non_reply_is_ignored() {
    let clock = MockClock::new();
    let attempts = Rc::new(Cell::new(0));
    let seen = attempts.clone();
    let link = FakeLink::new(clock.clone()).with_responder(move |sent| {
        let request = BootpPacket::parse(&sent.payload).unwrap();
        seen.set(seen.get() + 1);
        let mut frame = reply_frame(&request, request.xid, "vmlinux");
        if seen.get() == 1 {
            // Turn the reply back into a request: op is the first UDP payload byte
            frame[42] = 1;
        }
        vec![frame]
    });
    let mut transport = unbound_transport(link, clock);

    assert!(BootpClient::default().discover(&mut transport, None).is_ok());
    assert_eq!(attempts.get(), 2);
}

#[test]
fn test_secs_counts_from_first_attempt() {
    let clock = MockClock::new();
    let link = FakeLink::new(clock.clone());
    let mut transport = unbound_transport(link, clock);

    let client = BootpClient::new(3, Duration::from_secs(3));
    assert!(client.discover(&mut transport, None).is_err());

    let secs: Vec<u16> = transport
        .link()
        .sent_datagrams()
        .iter()
        .map(|d| BootpPacket::parse(&d.payload).unwrap().secs)
        .collect();
    assert_eq!(secs.len(), 3);
    assert_eq!(secs[0], 0);
    assert!(secs[1] >= 3);
    assert!(secs[2] > secs[1]);
}
