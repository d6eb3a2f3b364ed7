//! Error types for the netboot stack
//!
//! Each layer has its own error type: link faults come from the network
//! driver, transport faults wrap them with a direction, and the protocol
//! clients report only terminal conditions (retry budget exhausted, server
//! error, out of memory). [`NetbootError`] is the umbrella the session
//! driver returns.

use thiserror::Error;

/// Error reported by a [`LinkLayer`](crate::link::LinkLayer) implementation
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No frame arrived before the hardware timeout
    #[error("timed out")]
    Timeout,

    /// The device failed to transmit the frame
    #[error("send error")]
    SendError,

    /// The device failed to deliver a received frame
    #[error("receive error")]
    ReceiveError,

    /// Frame alignment/framing error
    #[error("framing error")]
    FramingError,

    /// Receive buffer overflow
    #[error("overflow")]
    Overflow,

    /// Frame check sequence mismatch
    #[error("CRC error")]
    CrcError,
}

/// Error type for UDP transport operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The link layer refused the outgoing frame
    #[error("failed to send frame: {0}")]
    Send(#[source] LinkError),

    /// The link layer failed, or no acceptable frame arrived in time
    #[error("failed to receive frame: {0}")]
    Recv(#[source] LinkError),

    /// Payload does not fit in a single Ethernet frame
    #[error("payload too large: {len} bytes (max: {max})")]
    PayloadTooLarge { len: usize, max: usize },
}

impl TransportError {
    /// Check if this error is a receive timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Recv(LinkError::Timeout))
    }
}

/// Error type for BOOTP discovery
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BootpError {
    /// Every attempt failed
    #[error("no boot server found after {attempts} attempts")]
    NoServer { attempts: u32 },
}

/// Error type for TFTP transfers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TftpError {
    /// Could not send a request or acknowledgment
    #[error("transfer failed: could not send to server: {0}")]
    Send(#[source] TransportError),

    /// No usable reply within the retry budget
    #[error("transfer failed: no reply from server: {0}")]
    Recv(#[source] TransportError),

    /// The server aborted the transfer
    #[error("transfer failed: server error {code}: {message}")]
    Server { code: u16, message: String },

    /// The image store could not hold the file
    #[error("transfer failed: out of memory: {0}")]
    OutOfMemory(#[source] StoreError),

    /// Malformed TFTP packet
    #[error("invalid TFTP packet: {0}")]
    InvalidPacket(String),
}

/// Error type for the chunked image store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Write would need more chunks than the store may hold
    #[error("image too large: offset {offset} exceeds capacity of {capacity} bytes")]
    CapacityExceeded { offset: u64, capacity: u64 },

    /// The allocator could not provide a chunk
    #[error("failed to allocate {size}-byte chunk")]
    AllocationFailed { size: usize },

    /// Seek target outside `[0, total_size]`; the position was clamped
    #[error("seek to {requested} out of range, clamped to {clamped}")]
    SeekOutOfRange { requested: i128, clamped: u64 },
}

/// Error type for invalid configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Chunk size is zero or not a multiple of the TFTP block size
    #[error("invalid chunk size {0}: must be a non-zero multiple of 512")]
    InvalidChunkSize(usize),

    /// Store capacity is zero
    #[error("invalid max chunks: must be at least 1")]
    InvalidMaxChunks,

    /// Chunk size times chunk count does not fit in 64 bits
    #[error("image store capacity overflows: {chunk_size} x {max_chunks} bytes")]
    CapacityTooLarge { chunk_size: usize, max_chunks: usize },

    /// A retry budget is zero
    #[error("invalid {0}: must be at least 1")]
    InvalidRetries(&'static str),

    /// Boot file name does not fit the BOOTP file field
    #[error("boot filename too long: {len} bytes (max: {max})")]
    FilenameTooLong { len: usize, max: usize },
}

/// Error type for a whole netboot session
#[derive(Debug, Error)]
pub enum NetbootError {
    /// The link layer reported no usable device
    #[error("no network device found")]
    NoDevice,

    /// The device was found but could not be initialized
    #[error("failed to initialize network device: {0}")]
    LinkInit(#[source] LinkError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Discovery failed
    #[error(transparent)]
    Bootp(#[from] BootpError),

    /// Download failed
    #[error(transparent)]
    Tftp(#[from] TftpError),

    /// Neither a downloaded image nor a fallback file is available
    #[error("no boot image available")]
    NoImage,

    /// I/O error on the fallback file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for netboot operations
pub type Result<T> = std::result::Result<T, NetbootError>;
