//! Boot image selection
//!
//! The loader reads the kernel through one handle whether it came over the
//! network or from a local fallback file.

use crate::error::{NetbootError, Result};
use crate::store::ChunkedImageStore;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::info;

/// Where a [`BootImage`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Network,
    Local,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Network => write!(f, "network"),
            ImageSource::Local => write!(f, "local"),
        }
    }
}

/// A readable, seekable boot image
#[derive(Debug)]
pub enum BootImage {
    /// Downloaded over TFTP
    Network(ChunkedImageStore),
    /// Fallback file on local storage
    Local(File),
}

impl BootImage {
    /// Pick the image to boot
    ///
    /// A populated store wins. Otherwise `fallback` is opened. With neither
    /// the result is [`NetbootError::NoImage`].
    pub fn select(store: Option<ChunkedImageStore>, fallback: Option<&Path>) -> Result<Self> {
        if let Some(store) = store.filter(ChunkedImageStore::is_populated) {
            info!(size = store.total_size(), "Booting downloaded image");
            return Ok(BootImage::Network(store));
        }

        match fallback {
            Some(path) => {
                let file = File::open(path)?;
                info!(path = %path.display(), "Booting local image");
                Ok(BootImage::Local(file))
            }
            None => Err(NetbootError::NoImage),
        }
    }

    /// Image size in bytes
    pub fn len(&self) -> io::Result<u64> {
        match self {
            BootImage::Network(store) => Ok(store.total_size()),
            BootImage::Local(file) => Ok(file.metadata()?.len()),
        }
    }

    /// Check if the image is empty
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn source(&self) -> ImageSource {
        match self {
            BootImage::Network(_) => ImageSource::Network,
            BootImage::Local(_) => ImageSource::Local,
        }
    }
}

impl Read for BootImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BootImage::Network(store) => Read::read(store, buf),
            BootImage::Local(file) => file.read(buf),
        }
    }
}

impl Seek for BootImage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            BootImage::Network(store) => Seek::seek(store, pos),
            BootImage::Local(file) => file.seek(pos),
        }
    }
}
