//! Builder pattern for configuring and constructing demuxers.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//! use mpa_demux::source::ReadSeekSource;
//! use mpa_demux::DemuxerBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = File::open("audio.mp3")?;
//!     let len = file.metadata()?.len();
//!
//!     let mut demuxer = DemuxerBuilder::new()
//!         .with_source(ReadSeekSource::new(file, None))
//!         .with_byte_len(len)       // Enables duration estimation
//!         .with_read_size(16 * 1024)
//!         .build()?;
//!     demuxer.init()?;
//!
//!     // Use the demuxer...
//!     Ok(())
//! }
//! ```
//!
//! # Settings
//!
//! - `byte_len` - Total length of the stream in bytes, overrides what the source reports
//! - `read_size` - Size of the buffers read while scanning for frames

use std::sync::Arc;

use super::frame::HEADER_SIZE;
use super::Mp3Demuxer;
use crate::common::assert_error_traits;
use crate::source::ByteSource;

/// Default size of the buffers read while scanning for frames.
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Error returned by [`DemuxerBuilder::build`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("No byte source was provided")]
    MissingSource,
}
assert_error_traits!(BuildError);

/// Demuxer configuration settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// The length of the stream in bytes.
    /// This is required for:
    /// - Duration estimation of streams without a VBR header
    /// - Stopping reads at the end of a source that keeps growing
    ///
    /// When unset, the length reported by the source is used.
    pub(crate) byte_len: Option<u64>,

    /// How many bytes are read at once while looking for the next frame. Bounds the
    /// memory used per read and the work done between two reads.
    pub(crate) read_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            byte_len: None,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

impl Settings {
    #[inline]
    pub fn byte_len(&self) -> Option<u64> {
        self.byte_len
    }

    #[inline]
    pub fn read_size(&self) -> usize {
        self.read_size
    }
}

/// Builder for configuring and creating a demuxer.
///
/// The demuxer is returned uninitialized, call [`Mp3Demuxer::init`] before use.
#[derive(Clone, Debug)]
pub struct DemuxerBuilder<S: ?Sized> {
    /// The byte source to demux.
    source: Option<Arc<S>>,
    /// Configuration settings for the demuxer.
    settings: Settings,
}

impl<S: ?Sized> Default for DemuxerBuilder<S> {
    fn default() -> Self {
        Self {
            source: None,
            settings: Settings::default(),
        }
    }
}

impl<S: ByteSource> DemuxerBuilder<S> {
    /// Sets the byte source to demux.
    pub fn with_source(mut self, source: S) -> Self {
        self.source = Some(Arc::new(source));
        self
    }
}

impl<S: ByteSource + ?Sized> DemuxerBuilder<S> {
    /// Creates a new demuxer builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a byte source that is shared with other owners, for example other demuxers.
    pub fn with_shared_source(mut self, source: Arc<S>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the byte length of the stream.
    ///
    /// An incorrect byte length leads to incorrect duration estimates and may cut the
    /// stream short.
    pub fn with_byte_len(mut self, byte_len: u64) -> Self {
        self.settings.byte_len = Some(byte_len);
        self
    }

    /// Sets how many bytes are read at once while scanning, 4096 by default.
    ///
    /// Values smaller than a frame header are raised to the header size.
    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.settings.read_size = read_size.max(HEADER_SIZE);
        self
    }

    /// Creates a new demuxer with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::MissingSource` if no source was set.
    pub fn build(self) -> Result<Mp3Demuxer<S>, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        Ok(Mp3Demuxer::with_settings(source, self.settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source() {
        let result = DemuxerBuilder::<Vec<u8>>::new().with_byte_len(10).build();
        assert!(matches!(result, Err(BuildError::MissingSource)));
    }

    #[test]
    fn settings_are_applied() {
        let demuxer = DemuxerBuilder::new()
            .with_source(vec![0u8; 16])
            .with_byte_len(8)
            .with_read_size(1)
            .build()
            .unwrap();
        assert_eq!(demuxer.settings().byte_len(), Some(8));
        assert_eq!(demuxer.settings().read_size(), HEADER_SIZE);
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.byte_len(), None);
        assert_eq!(settings.read_size(), DEFAULT_READ_SIZE);
    }
}
