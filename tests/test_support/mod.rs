#![allow(dead_code)]
/// in separate folder so its not ran as integration test
/// builds synthetic MPEG audio streams, frames carry a valid header and a silent payload.
use std::io;
use std::sync::Mutex;

use mpa_demux::ByteSource;

/// MPEG1 Layer III, 128kbps, 44100Hz, stereo, no padding.
pub const HEADER_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
/// Same with the padding bit set.
pub const HEADER_128K_PADDED: [u8; 4] = [0xFF, 0xFB, 0x92, 0x00];
pub const FRAME_LEN_128K: usize = 417;
pub const SAMPLES_PER_FRAME: u32 = 1152;
pub const SAMPLE_RATE: u32 = 44_100;

/// Offset of the Xing tag in a stereo MPEG1 frame (header + 32 bytes of side info).
const XING_OFFSET: usize = 36;

pub fn frame(header: [u8; 4], len: usize) -> Vec<u8> {
    let mut frame = vec![0u8; len];
    frame[..4].copy_from_slice(&header);
    frame
}

pub fn frames(header: [u8; 4], len: usize, count: usize) -> Vec<u8> {
    (0..count).flat_map(|_| frame(header, len)).collect()
}

/// `count` 128kbps frames.
pub fn cbr_stream(count: usize) -> Vec<u8> {
    frames(HEADER_128K, FRAME_LEN_128K, count)
}

/// An ID3v2.3 tag with a zeroed body of `body_len` bytes.
pub fn id3_tag(body_len: u32) -> Vec<u8> {
    let mut tag = vec![b'I', b'D', b'3', 3, 0, 0];
    for shift in [21, 14, 7, 0] {
        tag.push(((body_len >> shift) & 0x7F) as u8);
    }
    tag.resize(10 + body_len as usize, 0);
    tag
}

/// A 128kbps frame holding a Xing header with a frame count, and optionally the byte count
/// and a linear seek table.
pub fn xing_frame(num_frames: u32, num_bytes: Option<u32>) -> Vec<u8> {
    let mut frame = frame(HEADER_128K, FRAME_LEN_128K);
    let mut xing = b"Xing".to_vec();
    let flags: u32 = if num_bytes.is_some() { 0x1 | 0x2 | 0x4 } else { 0x1 };
    xing.extend_from_slice(&flags.to_be_bytes());
    xing.extend_from_slice(&num_frames.to_be_bytes());
    if let Some(num_bytes) = num_bytes {
        xing.extend_from_slice(&num_bytes.to_be_bytes());
        xing.extend((0..100u32).map(|i| (i * 256 / 100) as u8));
    }
    frame[XING_OFFSET..XING_OFFSET + xing.len()].copy_from_slice(&xing);
    frame
}

/// Exact playback time of `count` 128kbps frames in seconds.
pub fn cbr_seconds(count: usize) -> f64 {
    count as f64 * SAMPLES_PER_FRAME as f64 / SAMPLE_RATE as f64
}

/// A source that is still being downloaded: its length is unknown and data can be appended.
#[derive(Default)]
pub struct GrowingSource {
    data: Mutex<Vec<u8>>,
}

impl GrowingSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    pub fn append(&self, bytes: &[u8]) {
        self.data.lock().unwrap().extend_from_slice(bytes);
    }
}

impl ByteSource for GrowingSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.data.lock().unwrap().read_at(offset, buf)
    }

    fn len(&self) -> Option<u64> {
        None
    }
}

/// A source whose reads always fail.
pub struct FailingSource;

impl ByteSource for FailingSource {
    fn read_at(&self, _offset: u64, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("device unplugged"))
    }

    fn len(&self) -> Option<u64> {
        Some(1000)
    }
}
