//! MPEG audio demuxing.
//!
//! [`Mp3Demuxer`] is the entry point. It exposes the single audio track of an MPEG audio
//! stream as an [`Mp3TrackDemuxer`], which hands out timestamped [`AudioPacket`]s and seeks
//! by time. The lower level building blocks ([`FrameHeader`], [`FrameParser`], ...) are
//! public as well for callers that want to scan streams themselves.

use std::sync::Arc;

use crate::common::assert_error_traits;
use crate::source::ByteSource;

pub mod builder;
mod frame;
mod id3;
mod parser;
mod track;
mod vbr;

pub use self::builder::{BuildError, DemuxerBuilder, Settings};
pub use self::frame::{Frame, FrameHeader, Layer, MpegVersion, HEADER_SIZE};
pub use self::id3::{Id3Header, Id3Parser, Id3Probe, ID3_HEADER_SIZE};
pub use self::parser::FrameParser;
pub use self::track::{
    AudioPacket, Mp3TrackDemuxer, SamplesError, SeekError, TrackInfo, BIT_DEPTH, MIME_TYPE,
};
pub use self::vbr::{VbrHeader, VbrHeaderType, TOC_SIZE};

/// Kinds of tracks a container may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    Audio,
    Video,
    Text,
}

/// Error returned by [`Mp3Demuxer::init`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InitError {
    /// No frame could be read yet, the source may still be growing.
    #[error("Not enough data to find the first audio frame")]
    WaitingForData,
    /// The whole stream was read without finding a playable frame.
    #[error("The stream does not contain MPEG audio")]
    InvalidTrack,
}
assert_error_traits!(InitError);

/// Demuxer for MPEG audio streams (MP3 and its layer I and II siblings).
///
/// An MPEG audio stream holds exactly one audio track.
///
/// # Examples
///
/// ```
/// use mpa_demux::{Mp3Demuxer, TrackType};
///
/// // Three 128kbps, 44.1kHz stereo frames.
/// let mut stream = Vec::new();
/// for _ in 0..3 {
///     let mut frame = vec![0u8; 417];
///     frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
///     stream.extend(frame);
/// }
///
/// let mut demuxer = Mp3Demuxer::new(stream);
/// demuxer.init().unwrap();
/// let track = demuxer.track_demuxer(TrackType::Audio, 0).unwrap();
/// let packets = track.get_samples(3).unwrap();
/// assert_eq!(packets.len(), 3);
/// ```
pub struct Mp3Demuxer<S: ?Sized> {
    source: Arc<S>,
    settings: Settings,
    track: Option<Mp3TrackDemuxer<S>>,
}

impl<S: ByteSource> Mp3Demuxer<S> {
    /// Creates an uninitialized demuxer with default settings.
    pub fn new(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }
}

impl<S: ByteSource + ?Sized> Mp3Demuxer<S> {
    /// Creates an uninitialized demuxer reading from a shared source.
    pub fn from_shared(source: Arc<S>) -> Self {
        Self::with_settings(source, Settings::default())
    }

    /// Builder for a demuxer with custom settings.
    pub fn builder() -> DemuxerBuilder<S> {
        DemuxerBuilder::new()
    }

    pub(crate) fn with_settings(source: Arc<S>, settings: Settings) -> Self {
        Mp3Demuxer {
            source,
            settings,
            track: None,
        }
    }

    /// Locates the first frame and reads the track metadata.
    ///
    /// May be called again after [`InitError::WaitingForData`] once the source holds more
    /// data.
    pub fn init(&mut self) -> Result<(), InitError> {
        let track = self.track.get_or_insert_with(|| {
            Mp3TrackDemuxer::with_settings(Arc::clone(&self.source), self.settings.clone())
        });
        if track.init() {
            return Ok(());
        }

        // Only a source of known length that was read to the end cannot get any better.
        let error = match track.stream_length() {
            Some(len) if track.resource_offset() >= len => InitError::InvalidTrack,
            _ => InitError::WaitingForData,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(%error, offset = track.resource_offset(), "initialization failed");
        Err(error)
    }

    pub fn has_track_type(&self, track_type: TrackType) -> bool {
        track_type == TrackType::Audio
    }

    pub fn number_tracks(&self, track_type: TrackType) -> usize {
        usize::from(self.has_track_type(track_type))
    }

    /// The demuxer of the `index`th track of the given type, once [`init`](Self::init) has
    /// succeeded.
    pub fn track_demuxer(
        &mut self,
        track_type: TrackType,
        index: usize,
    ) -> Option<&mut Mp3TrackDemuxer<S>> {
        if index >= self.number_tracks(track_type) {
            return None;
        }
        self.track.as_mut().filter(|track| track.is_initialized())
    }

    /// Metadata of the audio track, `None` until initialized.
    pub fn track_info(&self) -> Option<TrackInfo> {
        self.track.as_ref().and_then(Mp3TrackDemuxer::info)
    }

    /// MPEG audio can always be seeked, at worst by scanning.
    pub fn is_seekable(&self) -> bool {
        true
    }

    /// Informs the demuxer that the source has grown. Nothing to do, reads are always made
    /// against the current source content.
    pub fn notify_data_arrived(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!("data arrived");
    }

    /// Informs the demuxer that source data has been evicted. Nothing to do.
    pub fn notify_data_removed(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::trace!("data removed");
    }

    /// A new, independently initialized demuxer over the same source.
    pub fn try_clone(&self) -> Result<Self, InitError> {
        let mut demuxer = Self::with_settings(Arc::clone(&self.source), self.settings.clone());
        demuxer.init()?;
        Ok(demuxer)
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}
