//! TFTP packet handling
//!
//! This module provides utilities for parsing and building TFTP packets
//! according to RFC 1350. Option extensions are not supported.

use crate::error::TftpError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Well-known TFTP server port
pub const TFTP_PORT: u16 = 69;

/// Data block size (RFC 1350)
pub const BLOCK_SIZE: usize = 512;

/// TFTP opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Opcode {
    /// Read request
    Rrq = 1,
    /// Write request
    Wrq = 2,
    /// Data packet
    Data = 3,
    /// Acknowledgment
    Ack = 4,
    /// Error
    Error = 5,
}

impl TryFrom<u16> for Opcode {
    type Error = TftpError;

    fn try_from(value: u16) -> Result<Self, TftpError> {
        match value {
            1 => Ok(Opcode::Rrq),
            2 => Ok(Opcode::Wrq),
            3 => Ok(Opcode::Data),
            4 => Ok(Opcode::Ack),
            5 => Ok(Opcode::Error),
            _ => Err(TftpError::InvalidPacket(format!("unknown opcode: {}", value))),
        }
    }
}

/// TFTP error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    /// Not defined
    NotDefined = 0,
    /// File not found
    FileNotFound = 1,
    /// Access violation
    AccessViolation = 2,
    /// Disk full or allocation exceeded
    DiskFull = 3,
    /// Illegal operation
    IllegalOperation = 4,
    /// Unknown transfer ID
    UnknownTransferId = 5,
    /// File already exists
    FileAlreadyExists = 6,
    /// No such user
    NoSuchUser = 7,
}

impl From<u16> for ErrorCode {
    fn from(value: u16) -> Self {
        match value {
            1 => ErrorCode::FileNotFound,
            2 => ErrorCode::AccessViolation,
            3 => ErrorCode::DiskFull,
            4 => ErrorCode::IllegalOperation,
            5 => ErrorCode::UnknownTransferId,
            6 => ErrorCode::FileAlreadyExists,
            7 => ErrorCode::NoSuchUser,
            _ => ErrorCode::NotDefined,
        }
    }
}

/// TFTP transfer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Binary (octet) mode, the only one a boot image is fetched in
    Octet,
}

impl TransferMode {
    fn from_str(s: &str) -> Result<Self, TftpError> {
        match s.to_lowercase().as_str() {
            "octet" => Ok(TransferMode::Octet),
            _ => Err(TftpError::InvalidPacket(format!("unsupported mode: {}", s))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            TransferMode::Octet => "octet",
        }
    }
}

/// TFTP packet types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TftpPacket {
    /// Read request
    ReadRequest { filename: String, mode: TransferMode },
    /// Data packet
    Data { block: u16, data: Bytes },
    /// Acknowledgment
    Ack { block: u16 },
    /// Error
    Error { code: u16, message: String },
}

impl TftpPacket {
    /// Parse a TFTP packet from bytes
    pub fn parse(data: &[u8]) -> Result<Self, TftpError> {
        if data.len() < 2 {
            return Err(TftpError::InvalidPacket("packet too short".to_string()));
        }

        let mut buf = data;
        let opcode = Opcode::try_from(buf.get_u16())?;

        match opcode {
            Opcode::Rrq => Self::parse_request(buf),
            Opcode::Wrq => Err(TftpError::InvalidPacket(
                "write requests not supported".to_string(),
            )),
            Opcode::Data => Self::parse_data(buf),
            Opcode::Ack => Self::parse_ack(buf),
            Opcode::Error => Self::parse_error(buf),
        }
    }

    fn parse_request(data: &[u8]) -> Result<Self, TftpError> {
        let mut parts = data.split(|&b| b == 0);

        let filename = parts
            .next()
            .filter(|b| !b.is_empty())
            .map(|b| String::from_utf8_lossy(b).to_string())
            .ok_or_else(|| TftpError::InvalidPacket("missing filename".to_string()))?;

        let mode_str = parts
            .next()
            .map(|b| String::from_utf8_lossy(b).to_string())
            .ok_or_else(|| TftpError::InvalidPacket("missing mode".to_string()))?;

        let mode = TransferMode::from_str(&mode_str)?;

        Ok(TftpPacket::ReadRequest { filename, mode })
    }

    fn parse_data(data: &[u8]) -> Result<Self, TftpError> {
        if data.len() < 2 {
            return Err(TftpError::InvalidPacket("data packet too short".to_string()));
        }

        let mut buf = data;
        let block = buf.get_u16();
        if buf.len() > BLOCK_SIZE {
            return Err(TftpError::InvalidPacket(format!(
                "data block too large: {} bytes",
                buf.len()
            )));
        }
        let data = Bytes::copy_from_slice(buf);

        Ok(TftpPacket::Data { block, data })
    }

    fn parse_ack(data: &[u8]) -> Result<Self, TftpError> {
        if data.len() < 2 {
            return Err(TftpError::InvalidPacket("ack packet too short".to_string()));
        }

        let mut buf = data;
        let block = buf.get_u16();

        Ok(TftpPacket::Ack { block })
    }

    fn parse_error(data: &[u8]) -> Result<Self, TftpError> {
        if data.len() < 2 {
            return Err(TftpError::InvalidPacket("error packet too short".to_string()));
        }

        let mut buf = data;
        let code = buf.get_u16();

        let message = buf
            .split(|&b| b == 0)
            .next()
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();

        Ok(TftpPacket::Error { code, message })
    }

    /// Encode the packet to bytes
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        match self {
            TftpPacket::ReadRequest { filename, mode } => {
                buf.put_u16(Opcode::Rrq as u16);
                buf.put_slice(filename.as_bytes());
                buf.put_u8(0);
                buf.put_slice(mode.as_str().as_bytes());
                buf.put_u8(0);
            }
            TftpPacket::Data { block, data } => {
                buf.put_u16(Opcode::Data as u16);
                buf.put_u16(*block);
                buf.put_slice(data);
            }
            TftpPacket::Ack { block } => {
                buf.put_u16(Opcode::Ack as u16);
                buf.put_u16(*block);
            }
            TftpPacket::Error { code, message } => {
                buf.put_u16(Opcode::Error as u16);
                buf.put_u16(*code);
                buf.put_slice(message.as_bytes());
                buf.put_u8(0);
            }
        }

        buf.freeze()
    }

    /// Create an octet-mode read request
    pub fn read_request(filename: impl Into<String>) -> Self {
        TftpPacket::ReadRequest {
            filename: filename.into(),
            mode: TransferMode::Octet,
        }
    }

    /// Create an error packet
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        TftpPacket::Error {
            code: code as u16,
            message: message.into(),
        }
    }

    /// Create a data packet
    pub fn data(block: u16, data: impl Into<Bytes>) -> Self {
        TftpPacket::Data {
            block,
            data: data.into(),
        }
    }

    /// Create an ACK packet
    pub fn ack(block: u16) -> Self {
        TftpPacket::Ack { block }
    }

    /// Get the packet's opcode
    pub fn opcode(&self) -> Opcode {
        match self {
            TftpPacket::ReadRequest { .. } => Opcode::Rrq,
            TftpPacket::Data { .. } => Opcode::Data,
            TftpPacket::Ack { .. } => Opcode::Ack,
            TftpPacket::Error { .. } => Opcode::Error,
        }
    }
}
