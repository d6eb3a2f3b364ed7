//! Netboot client configuration
//!
//! This module provides the configuration for a netboot session: retry
//! budgets, timeouts and the geometry of the in-memory image store.

use crate::bootp::packet::FILE_MAX_LEN;
use crate::error::ConfigError;
use crate::tftp::packet::BLOCK_SIZE;
use std::time::Duration;

/// Default number of BOOTP attempts
pub const DEFAULT_BOOTP_RETRIES: u32 = 5;

/// Default delay before each BOOTP attempt after the first
pub const DEFAULT_BOOTP_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Default TFTP retry budget per send and per receive step
pub const DEFAULT_TFTP_RETRIES: u32 = 5;

/// Default bound on a single filtered receive
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(4);

/// Default image chunk size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default number of chunks the image store may allocate (64 MiB total)
pub const DEFAULT_MAX_CHUNKS: usize = 1024;

/// Netboot session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetbootConfig {
    /// Boot file to ask the BOOTP server for
    /// If None, the server chooses
    pub boot_filename: Option<String>,

    /// Number of BOOTP request/reply attempts
    pub bootp_retries: u32,

    /// Sleep before every BOOTP attempt except the first
    pub bootp_retry_delay: Duration,

    /// TFTP retry budget, applied separately to each send and receive step
    pub tftp_retries: u32,

    /// Deadline for one filtered receive on the UDP transport
    pub receive_timeout: Duration,

    /// Size of one image store chunk in bytes
    pub chunk_size: usize,

    /// Maximum number of chunks in the image store
    pub max_chunks: usize,
}

impl Default for NetbootConfig {
    fn default() -> Self {
        Self {
            boot_filename: None,
            bootp_retries: DEFAULT_BOOTP_RETRIES,
            bootp_retry_delay: DEFAULT_BOOTP_RETRY_DELAY,
            tftp_retries: DEFAULT_TFTP_RETRIES,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl NetbootConfig {
    /// Set the boot filename requested from the server
    pub fn with_boot_filename(mut self, filename: impl Into<String>) -> Self {
        self.boot_filename = Some(filename.into());
        self
    }

    /// Set the number of BOOTP attempts
    pub fn with_bootp_retries(mut self, retries: u32) -> Self {
        self.bootp_retries = retries;
        self
    }

    /// Set the delay between BOOTP attempts
    pub fn with_bootp_retry_delay(mut self, delay: Duration) -> Self {
        self.bootp_retry_delay = delay;
        self
    }

    /// Set the TFTP retry budget
    pub fn with_tftp_retries(mut self, retries: u32) -> Self {
        self.tftp_retries = retries;
        self
    }

    /// Set the receive deadline
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Set the image store chunk size
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the image store chunk limit
    pub fn with_max_chunks(mut self, chunks: usize) -> Self {
        self.max_chunks = chunks;
        self
    }

    /// Largest image the configured store can hold, in bytes
    pub fn max_image_size(&self) -> u64 {
        (self.chunk_size as u64).saturating_mul(self.max_chunks as u64)
    }

    /// Check the configuration for values the stack cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 || self.chunk_size % BLOCK_SIZE != 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.max_chunks == 0 {
            return Err(ConfigError::InvalidMaxChunks);
        }
        if (self.chunk_size as u64)
            .checked_mul(self.max_chunks as u64)
            .is_none()
        {
            return Err(ConfigError::CapacityTooLarge {
                chunk_size: self.chunk_size,
                max_chunks: self.max_chunks,
            });
        }
        if self.bootp_retries == 0 {
            return Err(ConfigError::InvalidRetries("bootp retries"));
        }
        if self.tftp_retries == 0 {
            return Err(ConfigError::InvalidRetries("tftp retries"));
        }
        if let Some(ref name) = self.boot_filename {
            // One byte of the field is reserved for the terminating NUL
            if name.len() >= FILE_MAX_LEN {
                return Err(ConfigError::FilenameTooLong {
                    len: name.len(),
                    max: FILE_MAX_LEN - 1,
                });
            }
        }
        Ok(())
    }
}
