//! TFTP read client
//!
//! A minimal RFC 1350 client: octet-mode read requests only, 512-byte
//! blocks, lock-step acknowledgments. Downloaded blocks land in a
//! [`ChunkedImageStore`](crate::store::ChunkedImageStore).

pub mod client;
pub mod packet;

pub use client::TftpClient;
pub use packet::{ErrorCode, Opcode, TftpPacket, TransferMode, BLOCK_SIZE, TFTP_PORT};
