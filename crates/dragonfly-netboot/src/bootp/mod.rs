//! BOOTP (RFC 951) discovery

pub mod client;
pub mod packet;

pub use client::BootpClient;
pub use packet::{BootpPacket, OpCode, BOOTPC_PORT, BOOTPS_PORT};
