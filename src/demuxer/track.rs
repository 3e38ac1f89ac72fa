use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use super::builder::Settings;
use super::frame::Frame;
use super::id3::Id3Header;
use super::parser::FrameParser;
use super::vbr::VbrHeader;
use crate::common::{assert_error_traits, frames_to_duration, ChannelCount, SampleRate};
use crate::source::ByteSource;

/// MIME type reported for every MPEG audio track.
pub const MIME_TYPE: &str = "audio/mpeg";

/// Decoded sample size reported in [`TrackInfo::bit_depth`].
pub const BIT_DEPTH: u16 = 16;

/// Error returned by [`Mp3TrackDemuxer::get_samples`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SamplesError {
    #[error("At least one sample must be requested")]
    ZeroRequested,
    #[error("No more frames in the stream")]
    EndOfStream,
}
assert_error_traits!(SamplesError);

/// Error returned by [`Mp3TrackDemuxer::seek`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SeekError {
    /// Seeking needs the sample rate and frame size learnt during initialization.
    #[error("The track has not been initialized")]
    NotInitialized,
}
assert_error_traits!(SeekError);

/// Track metadata learnt from the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub sample_rate: SampleRate,
    pub channels: ChannelCount,
    pub bit_depth: u16,
    pub mime_type: &'static str,
    /// Exact when the stream carries a VBR header, estimated otherwise. `None` when the
    /// stream length is unknown.
    pub duration: Option<Duration>,
}

/// One compressed MPEG audio frame, ready to be handed to a decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPacket {
    /// Byte offset of the frame in the source.
    pub offset: u64,
    /// Presentation time of the first sample.
    pub time: Duration,
    pub duration: Duration,
    /// Position of the frame in the stream, starting at 0.
    pub index: u64,
    /// Every MPEG audio frame can start decoding.
    pub keyframe: bool,
    /// The whole frame, header included.
    pub data: Vec<u8>,
}

/// Turns a byte source into timestamped MPEG audio frames.
///
/// Reads are offset addressed and bounded by [`Settings::read_size`], so the demuxer can
/// work against a source that is still being downloaded: running out of data simply ends
/// the current operation early and it can be retried later.
pub struct Mp3TrackDemuxer<S: ?Sized> {
    source: Arc<S>,
    settings: Settings,
    parser: FrameParser,

    /// Where the next read starts.
    offset: u64,
    first_frame_offset: u64,

    num_parsed_frames: u64,
    /// Sum of the lengths of all parsed frames, for the average frame length.
    total_frame_len: u64,
    /// Index of the next frame, the time base for timestamps.
    frame_index: u64,

    samples_per_frame: u32,
    sample_rate: SampleRate,
    channels: ChannelCount,

    info: Option<TrackInfo>,
}

impl<S: ByteSource + ?Sized> Mp3TrackDemuxer<S> {
    /// Creates an uninitialized demuxer with default settings, see [`init`](Self::init).
    pub fn new(source: Arc<S>) -> Self {
        Self::with_settings(source, Settings::default())
    }

    pub(crate) fn with_settings(source: Arc<S>, settings: Settings) -> Self {
        Mp3TrackDemuxer {
            source,
            settings,
            parser: FrameParser::new(),
            offset: 0,
            first_frame_offset: 0,
            num_parsed_frames: 0,
            total_frame_len: 0,
            frame_index: 0,
            samples_per_frame: 0,
            sample_rate: 0,
            channels: 0,
            info: None,
        }
    }

    /// Probes the stream: parses the first frame for metadata and VBR information, then
    /// rewinds so that the first frame is also the first one returned by
    /// [`get_samples`](Self::get_samples).
    ///
    /// Returns `false` if no frame could be found or the frame does not describe a playable
    /// stream.
    pub fn init(&mut self) -> bool {
        self.reset();
        self.fast_seek(Duration::ZERO);

        let range = self.find_next_frame();
        if self.get_next_frame(range).is_none() {
            #[cfg(feature = "tracing")]
            tracing::debug!(offset = self.offset, "no frame found while probing");
            return false;
        }
        self.fast_seek(Duration::ZERO);

        if self.sample_rate == 0 || self.channels == 0 {
            return false;
        }

        let info = TrackInfo {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth: BIT_DEPTH,
            mime_type: MIME_TYPE,
            duration: self.duration(),
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate = info.sample_rate,
            channels = info.channels,
            duration = ?info.duration,
            first_frame_offset = self.first_frame_offset,
            stream_length = ?self.stream_length(),
            "initialized MPEG audio track"
        );
        self.info = Some(info);
        true
    }

    /// Metadata learnt by [`init`](Self::init), `None` before a successful initialization.
    pub fn info(&self) -> Option<TrackInfo> {
        self.info.clone()
    }

    /// Whether the last call to [`init`](Self::init) succeeded.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.info.is_some()
    }

    /// Moves to the frame at or right before `time`, returns the time actually reached.
    ///
    /// The position is first estimated from the stream statistics and then refined by
    /// stepping over frames. The reached time is never after `time` unless the stream ends
    /// before it.
    pub fn seek(&mut self, time: Duration) -> Result<Duration, SeekError> {
        if self.info.is_none() {
            return Err(SeekError::NotInitialized);
        }
        self.fast_seek(time);
        self.scan_until(time).ok_or(SeekError::NotInitialized)
    }

    /// Returns up to `count` consecutive frames.
    ///
    /// Fewer frames are returned when the stream, or the data available so far, ends first.
    pub fn get_samples(&mut self, count: usize) -> Result<Vec<AudioPacket>, SamplesError> {
        if count == 0 {
            return Err(SamplesError::ZeroRequested);
        }
        let mut packets = Vec::new();
        for _ in 0..count {
            let range = self.find_next_frame();
            match self.get_next_frame(range) {
                Some(packet) => packets.push(packet),
                None => break,
            }
        }
        if packets.is_empty() {
            return Err(SamplesError::EndOfStream);
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(
            requested = count,
            returned = packets.len(),
            frame_index = self.frame_index,
            "got samples"
        );
        Ok(packets)
    }

    /// Returns the demuxer to the state it was created in.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.offset = 0;
        self.first_frame_offset = 0;
        self.num_parsed_frames = 0;
        self.total_frame_len = 0;
        self.frame_index = 0;
        self.samples_per_frame = 0;
        self.sample_rate = 0;
        self.channels = 0;
        self.info = None;
    }

    /// Time ranges available without further reads.
    ///
    /// Not supported, always empty.
    pub fn buffered(&self) -> Vec<Range<Duration>> {
        #[cfg(feature = "tracing")]
        tracing::warn!("buffered ranges are not supported for MPEG audio");
        Vec::new()
    }

    /// Byte offset before which source data is no longer needed. Always 0.
    pub fn eviction_offset(&self, _time: Duration) -> u64 {
        0
    }

    /// Moves to an estimated position for `time` without reading.
    ///
    /// Seeking to zero always succeeds and lands exactly on the first frame. Other times
    /// need at least one parsed frame and return `None` otherwise. The estimate assumes a
    /// constant frame length unless a Xing seek table is available.
    pub fn fast_seek(&mut self, time: Duration) -> Option<Duration> {
        if time.is_zero() {
            self.offset = self.first_frame_offset;
            self.frame_index = 0;
            if self.num_parsed_frames == 0 {
                self.parser.reset();
            } else {
                self.parser.end_frame_session();
            }
            return Some(Duration::ZERO);
        }
        if self.samples_per_frame == 0 || self.num_parsed_frames == 0 {
            return None;
        }
        let average = self.average_frame_length()?;

        let mut num_frames =
            (time.as_secs_f64() * self.sample_rate as f64 / self.samples_per_frame as f64) as u64;
        if let Some(total) = self.num_frames() {
            num_frames = num_frames.min(total);
        }
        let relative = self
            .toc_offset(time)
            .unwrap_or((num_frames as f64 * average) as u64);
        self.offset = self.first_frame_offset.saturating_add(relative);
        self.frame_index = num_frames;
        self.parser.end_frame_session();

        #[cfg(feature = "tracing")]
        tracing::trace!(?time, offset = self.offset, frame_index = num_frames, "fast seek");
        self.duration_of(self.frame_index)
    }

    /// Steps frame by frame until the next frame would start after `time`.
    ///
    /// Moves back with [`fast_seek`](Self::fast_seek) first if the current position is
    /// already past `time`. Returns the time reached, `None` while the time base is unknown.
    pub fn scan_until(&mut self, time: Duration) -> Option<Duration> {
        if time.is_zero() {
            return self.fast_seek(time);
        }
        if self.duration_of(self.frame_index)? > time {
            self.fast_seek(time)?;
        }
        while self.duration_of(self.frame_index.saturating_add(1))? <= time {
            let range = self.find_next_frame();
            if !self.skip_next_frame(range) {
                break;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(?time, offset = self.offset, frame_index = self.frame_index, "scanned");
        self.duration_of(self.frame_index)
    }

    /// Stream duration, exact when the stream has a VBR header with a frame count.
    ///
    /// Otherwise estimated from the stream length and the average frame length, which
    /// needs a known stream length. `None` before the first frame is parsed.
    pub fn duration(&self) -> Option<Duration> {
        self.duration_of(self.num_frames()?)
    }

    /// Number of frames in the stream, from the VBR header or estimated like
    /// [`duration`](Self::duration).
    pub fn num_frames(&self) -> Option<u64> {
        if self.num_parsed_frames == 0 {
            return None;
        }
        match self.parser.vbr_info().num_frames() {
            Some(num_frames) => Some(num_frames as u64),
            None => {
                let stream_len = self.stream_length()?;
                let audio_len = stream_len.saturating_sub(self.first_frame_offset);
                Some((audio_len as f64 / self.average_frame_length()?) as u64)
            }
        }
    }

    /// Playback time of `num_frames` frames.
    pub fn duration_of(&self, num_frames: u64) -> Option<Duration> {
        frames_to_duration(num_frames, self.samples_per_frame, self.sample_rate)
    }

    /// Current read position in the source.
    #[inline]
    pub fn resource_offset(&self) -> u64 {
        self.offset
    }

    /// Total length of the source, from the settings or the source itself.
    pub fn stream_length(&self) -> Option<u64> {
        self.settings.byte_len.or_else(|| self.source.len())
    }

    /// Average length in bytes of the frames parsed so far.
    pub fn average_frame_length(&self) -> Option<f64> {
        if self.num_parsed_frames == 0 {
            return None;
        }
        Some(self.total_frame_len as f64 / self.num_parsed_frames as f64)
    }

    /// Byte offset of the first frame, past any ID3 tag.
    #[inline]
    pub fn first_frame_offset(&self) -> u64 {
        self.first_frame_offset
    }

    /// Index of the frame the next read returns.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn vbr_info(&self) -> &VbrHeader {
        self.parser.vbr_info()
    }

    #[inline]
    pub fn id3_header(&self) -> Option<&Id3Header> {
        self.parser.id3_header()
    }

    /// The first frame of the stream, invalid until one has been found.
    #[inline]
    pub fn first_frame(&self) -> &Frame {
        self.parser.first_frame()
    }

    /// Offset relative to the first frame interpolated from the Xing seek table.
    fn toc_offset(&self, time: Duration) -> Option<u64> {
        let vbr = self.parser.vbr_info();
        vbr.toc()?;
        let total = self.duration()?;
        if total.is_zero() {
            return None;
        }
        vbr.offset_for(time.as_secs_f64() / total.as_secs_f64())
    }

    /// Reads buffers from the current offset until the parser locates a frame.
    ///
    /// Returns the frame's byte range, empty once no further frame can be found in the
    /// data available.
    fn find_next_frame(&mut self) -> Range<u64> {
        let mut buffer = vec![0u8; self.settings.read_size];
        let mut frame_start = None;

        loop {
            let chunk_start = self.offset;
            let read = self.read(chunk_start, &mut buffer);
            if read == 0 {
                break;
            }
            self.offset += read as u64;
            #[cfg(feature = "tracing")]
            tracing::trace!(offset = chunk_start, read, "scanning for frame");

            if let Some(pos) = self.parser.parse(&buffer[..read]) {
                frame_start = chunk_start.checked_add_signed(pos as i64);
                break;
            }
        }

        let length = self.parser.current_frame().length() as u64;
        match frame_start {
            Some(start) if length > 0 => start..start.saturating_add(length),
            _ => 0..0,
        }
    }

    /// Reads the frame in `range` and advances past it.
    ///
    /// Returns `None` if the range is empty or the source does not hold the whole frame yet.
    /// In the latter case the read position is moved back to the start of the frame, unless
    /// the frame runs past the known end of the stream.
    fn get_next_frame(&mut self, range: Range<u64>) -> Option<AudioPacket> {
        if range.is_empty() {
            return None;
        }
        let len = usize::try_from(range.end - range.start).ok()?;
        let mut data = vec![0u8; len];
        let read = self.read_fully(range.start, &mut data);
        if read != len {
            #[cfg(feature = "tracing")]
            tracing::trace!(offset = range.start, len, read, "frame is truncated");
            // Unless the stream is known to end inside it, stay on the frame so that it is
            // found again once more data has arrived.
            if self.stream_length().map_or(true, |stream_len| range.end <= stream_len) {
                self.offset = range.start;
                self.parser.end_frame_session();
            }
            return None;
        }

        self.update_state(&range);
        let index = self.frame_index - 1;
        let packet = AudioPacket {
            offset: range.start,
            time: self.duration_of(index).unwrap_or_default(),
            duration: self.duration_of(1).unwrap_or_default(),
            index,
            keyframe: true,
            data,
        };

        if self.num_parsed_frames == 1 {
            self.parser.parse_vbr_header(&packet.data);
            self.first_frame_offset = range.start;
            #[cfg(feature = "tracing")]
            tracing::debug!(offset = range.start, "first frame");
        }
        Some(packet)
    }

    /// Advances past the frame in `range` without reading it.
    ///
    /// The first frame of the stream is always read, it may hold a VBR header.
    fn skip_next_frame(&mut self, range: Range<u64>) -> bool {
        if self.num_parsed_frames == 0 || range.is_empty() {
            return self.get_next_frame(range).is_some();
        }
        self.update_state(&range);
        true
    }

    fn update_state(&mut self, range: &Range<u64>) {
        let len = range.end - range.start;
        // Halving keeps the average while making room in the accumulator.
        if self.total_frame_len.checked_add(len).is_none() {
            self.total_frame_len /= 2;
            self.num_parsed_frames /= 2;
        }
        self.offset = range.end;
        self.total_frame_len += len;

        let header = self.parser.current_frame().header();
        self.samples_per_frame = header.samples_per_frame();
        self.sample_rate = header.sample_rate();
        self.channels = header.channels();

        self.num_parsed_frames += 1;
        self.frame_index += 1;
        self.parser.end_frame_session();
    }

    /// Reads once from the source.
    ///
    /// After initialization reads never go past the known stream length. Errors are
    /// reported as a read of zero bytes.
    fn read(&self, offset: u64, buf: &mut [u8]) -> usize {
        let mut len = buf.len();
        if self.info.is_some() {
            if let Some(stream_len) = self.stream_length() {
                let remaining = stream_len.saturating_sub(offset);
                len = len.min(usize::try_from(remaining).unwrap_or(usize::MAX));
            }
        }
        if len == 0 {
            return 0;
        }
        match self.source.read_at(offset, &mut buf[..len]) {
            Ok(read) => read.min(len),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(offset, error = %_err, "read from byte source failed");
                0
            }
        }
    }

    /// Reads until `buf` is full or the source has no more data.
    fn read_fully(&self, offset: u64, buf: &mut [u8]) -> usize {
        let mut filled = 0;
        while filled < buf.len() {
            let read = self.read(offset.saturating_add(filled as u64), &mut buf[filled..]);
            if read == 0 {
                break;
            }
            filled += read;
        }
        filled
    }
}
