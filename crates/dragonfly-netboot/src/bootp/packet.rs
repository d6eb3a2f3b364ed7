//! BOOTP packet handling
//!
//! This module provides the fixed 300-byte BOOTP record of RFC 951. Only the
//! fields a boot client needs are interpreted; the vendor area carries just
//! the magic cookie and an end marker.

use crate::session::MacAddr;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::net::Ipv4Addr;

/// BOOTP server port
pub const BOOTPS_PORT: u16 = 67;

/// BOOTP client port
pub const BOOTPC_PORT: u16 = 68;

/// Size of a BOOTP packet on the wire
pub const PACKET_LEN: usize = 300;

/// `chaddr` field length
pub const CHADDR_LEN: usize = 16;

/// `sname` field length
pub const SNAME_MAX_LEN: usize = 64;

/// `file` field length, including the terminating NUL
pub const FILE_MAX_LEN: usize = 128;

/// `vend` field length
pub const VEND_LEN: usize = 64;

/// RFC 1048 magic cookie followed by the end option
pub const MAGIC_COOKIE: [u8; 5] = [99, 130, 83, 99, 255];

/// Hardware type for 10Mb Ethernet
pub const HTYPE_ETHERNET: u8 = 1;

/// BOOTP operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Client to server
    BootRequest,
    /// Server to client
    BootReply,
    /// Anything else seen on the wire
    Invalid(u8),
}

impl From<u8> for OpCode {
    fn from(value: u8) -> Self {
        match value {
            1 => OpCode::BootRequest,
            2 => OpCode::BootReply,
            x => OpCode::Invalid(x),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        match op {
            OpCode::BootRequest => 1,
            OpCode::BootReply => 2,
            OpCode::Invalid(x) => x,
        }
    }
}

/// BOOTP request or reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootpPacket {
    pub op: OpCode,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    /// Transaction ID
    pub xid: u32,
    /// Seconds since the client started trying
    pub secs: u16,
    pub unused: u16,
    /// Client IP, if the client already knows it
    pub ciaddr: Ipv4Addr,
    /// "Your" IP, assigned by the server
    pub yiaddr: Ipv4Addr,
    /// Boot server IP
    pub siaddr: Ipv4Addr,
    /// Relay agent IP
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; CHADDR_LEN],
    pub sname: [u8; SNAME_MAX_LEN],
    pub file: [u8; FILE_MAX_LEN],
    pub vend: [u8; VEND_LEN],
}

impl BootpPacket {
    /// Create a request template for the client with MAC `mac`
    ///
    /// `filename` longer than 127 bytes is truncated so the field stays
    /// NUL-terminated.
    pub fn request(mac: MacAddr, filename: Option<&str>) -> Self {
        let mut chaddr = [0u8; CHADDR_LEN];
        chaddr[..6].copy_from_slice(&mac.0);

        let mut file = [0u8; FILE_MAX_LEN];
        if let Some(name) = filename {
            let bytes = name.as_bytes();
            let len = bytes.len().min(FILE_MAX_LEN - 1);
            file[..len].copy_from_slice(&bytes[..len]);
        }

        let mut vend = [0u8; VEND_LEN];
        vend[..MAGIC_COOKIE.len()].copy_from_slice(&MAGIC_COOKIE);

        Self {
            op: OpCode::BootRequest,
            htype: HTYPE_ETHERNET,
            hlen: 6,
            hops: 0,
            xid: 0,
            secs: 0,
            unused: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr,
            sname: [0u8; SNAME_MAX_LEN],
            file,
            vend,
        }
    }

    /// Parse a packet; None if it is shorter than the fixed record
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < PACKET_LEN {
            return None;
        }

        let mut buf = data;
        let op = OpCode::from(buf.get_u8());
        let htype = buf.get_u8();
        let hlen = buf.get_u8();
        let hops = buf.get_u8();
        let xid = buf.get_u32();
        let secs = buf.get_u16();
        let unused = buf.get_u16();
        let ciaddr = Ipv4Addr::from(buf.get_u32());
        let yiaddr = Ipv4Addr::from(buf.get_u32());
        let siaddr = Ipv4Addr::from(buf.get_u32());
        let giaddr = Ipv4Addr::from(buf.get_u32());

        let mut chaddr = [0u8; CHADDR_LEN];
        buf.copy_to_slice(&mut chaddr);
        let mut sname = [0u8; SNAME_MAX_LEN];
        buf.copy_to_slice(&mut sname);
        let mut file = [0u8; FILE_MAX_LEN];
        buf.copy_to_slice(&mut file);
        let mut vend = [0u8; VEND_LEN];
        buf.copy_to_slice(&mut vend);

        Some(Self {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            unused,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            vend,
        })
    }

    /// Encode the packet to bytes
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(PACKET_LEN);
        buf.put_u8(self.op.into());
        buf.put_u8(self.htype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.hops);
        buf.put_u32(self.xid);
        buf.put_u16(self.secs);
        buf.put_u16(self.unused);
        buf.put_u32(self.ciaddr.into());
        buf.put_u32(self.yiaddr.into());
        buf.put_u32(self.siaddr.into());
        buf.put_u32(self.giaddr.into());
        buf.put_slice(&self.chaddr);
        buf.put_slice(&self.sname);
        buf.put_slice(&self.file);
        buf.put_slice(&self.vend);
        buf.freeze()
    }

    /// Boot file name, or None when the field is empty
    pub fn file_name(&self) -> Option<String> {
        c_string(&self.file)
    }

    /// Server host name, or None when the field is empty
    pub fn server_name(&self) -> Option<String> {
        c_string(&self.sname)
    }

    /// Client MAC from `chaddr`
    pub fn client_mac(&self) -> MacAddr {
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&self.chaddr[..6]);
        MacAddr(mac)
    }
}

fn c_string(field: &[u8]) -> Option<String> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&field[..end]).into_owned())
}
