//! Chunked in-memory image store
//!
//! A downloaded image is kept in fixed-size chunks that are allocated the
//! first time a byte inside them is written. Once the transfer completes the
//! store behaves like a read-only file over `[0, total_size)`.

use crate::config::NetbootConfig;
use crate::error::StoreError;
use std::io;
use tracing::{debug, trace};

/// Origin for [`ChunkedImageStore::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// From the start of the image
    Start,
    /// From the current position
    Current,
    /// From the end of the image
    End,
}

/// Image buffer made of lazily allocated chunks
pub struct ChunkedImageStore {
    chunks: Vec<Option<Box<[u8]>>>,
    chunk_size: usize,
    max_chunks: usize,
    total_size: u64,
    position: u64,
}

impl ChunkedImageStore {
    /// Create an empty store; nothing is allocated until the first write
    pub fn new(chunk_size: usize, max_chunks: usize) -> Self {
        Self {
            chunks: Vec::new(),
            chunk_size: chunk_size.max(1),
            max_chunks,
            total_size: 0,
            position: 0,
        }
    }

    /// Create a store sized from session configuration
    pub fn from_config(config: &NetbootConfig) -> Self {
        Self::new(config.chunk_size, config.max_chunks)
    }

    /// Size of one chunk in bytes
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Largest image this store can hold
    pub fn capacity(&self) -> u64 {
        (self.chunk_size as u64).saturating_mul(self.max_chunks as u64)
    }

    /// Logical image size
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Set the logical image size, clamped to capacity
    pub fn set_total_size(&mut self, size: u64) {
        self.total_size = size.min(self.capacity());
        self.position = self.position.min(self.total_size);
    }

    /// Current read position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of chunks currently allocated
    pub fn allocated_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    /// Check if the store holds a downloaded image
    pub fn is_populated(&self) -> bool {
        self.total_size > 0
    }

    /// Copy `bytes` into the image at `offset`, allocating chunks as needed
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<(), StoreError> {
        let end = offset.saturating_add(bytes.len() as u64);
        if end > self.capacity() || offset.checked_add(bytes.len() as u64).is_none() {
            return Err(StoreError::CapacityExceeded {
                offset: end,
                capacity: self.capacity(),
            });
        }

        let chunk_size = self.chunk_size as u64;
        let mut pos = offset;
        let mut rest = bytes;
        while !rest.is_empty() {
            let index = (pos / chunk_size) as usize;
            let within = (pos % chunk_size) as usize;
            let n = rest.len().min(self.chunk_size - within);

            let chunk = self.chunk_mut(index)?;
            chunk[within..within + n].copy_from_slice(&rest[..n]);

            pos += n as u64;
            rest = &rest[n..];
        }
        Ok(())
    }

    fn chunk_mut(&mut self, index: usize) -> Result<&mut [u8], StoreError> {
        if index >= self.chunks.len() {
            let extra = index + 1 - self.chunks.len();
            self.chunks
                .try_reserve_exact(extra)
                .map_err(|_| StoreError::AllocationFailed {
                    size: extra.saturating_mul(std::mem::size_of::<Option<Box<[u8]>>>()),
                })?;
            self.chunks.resize_with(index + 1, || None);
        }
        let chunk = match self.chunks[index].take() {
            Some(chunk) => chunk,
            None => {
                trace!(index, size = self.chunk_size, "Allocating image chunk");
                allocate_chunk(self.chunk_size)?
            }
        };
        Ok(self.chunks[index].insert(chunk))
    }

    /// Read from the current position into `buf`, returning the byte count
    ///
    /// Never reads past `total_size`. Regions that were never written read
    /// as zeros.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.total_size.saturating_sub(self.position);
        let count = (buf.len() as u64).min(remaining) as usize;
        let chunk_size = self.chunk_size as u64;

        let mut done = 0;
        while done < count {
            let pos = self.position + done as u64;
            let index = (pos / chunk_size) as usize;
            let within = (pos % chunk_size) as usize;
            let n = (count - done).min(self.chunk_size - within);

            match self.chunks.get(index).and_then(|c| c.as_deref()) {
                Some(chunk) => buf[done..done + n].copy_from_slice(&chunk[within..within + n]),
                None => buf[done..done + n].fill(0),
            }
            done += n;
        }

        self.position += count as u64;
        count
    }

    /// Move the read position
    ///
    /// The position is clamped to `[0, total_size]`. A target outside that
    /// range still moves the position (to the nearest bound) but returns
    /// [`StoreError::SeekOutOfRange`].
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64, StoreError> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.position as i128,
            Whence::End => self.total_size as i128,
        };
        self.seek_to(base + offset as i128)
    }

    fn seek_to(&mut self, requested: i128) -> Result<u64, StoreError> {
        let clamped = requested.clamp(0, self.total_size as i128) as u64;
        self.position = clamped;
        if requested != clamped as i128 {
            return Err(StoreError::SeekOutOfRange { requested, clamped });
        }
        Ok(clamped)
    }

    /// Drop all contents, ready for a new transfer
    pub fn reset(&mut self) {
        self.chunks.clear();
        self.total_size = 0;
        self.position = 0;
    }

    /// Release every chunk
    pub fn close(&mut self) {
        if !self.chunks.is_empty() {
            debug!(chunks = self.allocated_chunks(), "Releasing image store");
        }
        self.reset();
        self.chunks.shrink_to_fit();
    }
}

fn allocate_chunk(size: usize) -> Result<Box<[u8]>, StoreError> {
    let mut chunk = Vec::new();
    chunk
        .try_reserve_exact(size)
        .map_err(|_| StoreError::AllocationFailed { size })?;
    chunk.resize(size, 0);
    Ok(chunk.into_boxed_slice())
}

impl Default for ChunkedImageStore {
    fn default() -> Self {
        Self::from_config(&NetbootConfig::default())
    }
}

impl std::fmt::Debug for ChunkedImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedImageStore")
            .field("chunk_size", &self.chunk_size)
            .field("max_chunks", &self.max_chunks)
            .field("allocated_chunks", &self.allocated_chunks())
            .field("total_size", &self.total_size)
            .field("position", &self.position)
            .finish()
    }
}

impl io::Read for ChunkedImageStore {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChunkedImageStore::read(self, buf))
    }
}

impl io::Seek for ChunkedImageStore {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let requested = match pos {
            io::SeekFrom::Start(offset) => offset as i128,
            io::SeekFrom::Current(offset) => self.position as i128 + offset as i128,
            io::SeekFrom::End(offset) => self.total_size as i128 + offset as i128,
        };
        self.seek_to(requested)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}
