//! Streaming demuxer for MPEG audio (MP3).
//!
//! Turns a random access byte source into timestamped compressed audio frames plus track
//! metadata, without decoding any audio. The stream may be incomplete: every operation
//! works with the data available so far and can be retried once more has arrived.
//!
//! - Frames are located by scanning for frame headers, so leading garbage and corrupt
//!   sections are skipped over.
//! - A leading ID3v2 tag is skipped.
//! - Xing, `Info` and VBRI headers provide the exact duration of variable bitrate streams.
//! - Seeking estimates a byte position from the stream statistics, then steps over frames
//!   to reach the requested time.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::time::Duration;
//! use mpa_demux::source::ReadSeekSource;
//! use mpa_demux::{Mp3Demuxer, TrackType};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = ReadSeekSource::with_measured_len(File::open("music.mp3")?)?;
//!     let mut demuxer = Mp3Demuxer::new(source);
//!     demuxer.init()?;
//!
//!     let info = demuxer.track_info().ok_or("no track")?;
//!     println!("{} Hz, {} channels, {:?}", info.sample_rate, info.channels, info.duration);
//!
//!     let track = demuxer.track_demuxer(TrackType::Audio, 0).ok_or("no track")?;
//!     track.seek(Duration::from_secs(30))?;
//!     for packet in track.get_samples(10)? {
//!         println!("{:?} {} bytes", packet.time, packet.data.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! With the default `tracing` feature, initialization and scanning emit [`tracing`] events.
//! Disable default features to compile logging out.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod common;
pub mod demuxer;
pub mod source;

pub use crate::common::{ChannelCount, SampleRate};
pub use crate::demuxer::{
    AudioPacket, BuildError, DemuxerBuilder, InitError, Mp3Demuxer, Mp3TrackDemuxer,
    SamplesError, SeekError, Settings, TrackInfo, TrackType,
};
pub use crate::source::{ByteSource, ReadSeekSource};
