//! MPEG audio frame header decoding.
//!
//! Every frame starts with a 4 byte header:
//!
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! ```
//!
//! - A: sync (11 bits, all set)
//! - B: MPEG version (00 = 2.5, 01 = reserved, 10 = 2, 11 = 1)
//! - C: layer (00 = reserved, 01 = III, 10 = II, 11 = I)
//! - D: protection bit (0 = CRC follows the header)
//! - E: bitrate index (0000 = free format, 1111 = bad)
//! - F: sample rate index (11 = reserved)
//! - G: padding, H: private
//! - I: channel mode (11 = mono), J: mode extension, K: copyright, L: original, M: emphasis
//!
//! The header is validated one byte at a time so that a byte stream can be scanned for frame
//! boundaries without ever looking back more than one byte.

use crate::common::{ChannelCount, SampleRate};

/// Size of a frame header in bytes.
pub const HEADER_SIZE: usize = 4;

const SYNC1: usize = 0;
const SYNC2_VERSION_LAYER_PROTECTION: usize = 1;
const BITRATE_SAMPLERATE_PADDING_PRIVATE: usize = 2;
const CHANNELMODE_MODEEXT_COPY_ORIG_EMPH: usize = 3;

const RAW_VERSION_RESERVED: u8 = 1;
const RAW_LAYER_RESERVED: u8 = 0;
const RAW_BITRATE_BAD: u8 = 0xF;

// Indexed by raw version, then raw sample rate index.
const SAMPLE_RATES: [[u32; 4]; 4] = [
    [11_025, 12_000, 8_000, 0],  // MPEG 2.5
    [0, 0, 0, 0],                // reserved
    [22_050, 24_000, 16_000, 0], // MPEG 2
    [44_100, 48_000, 32_000, 0], // MPEG 1
];

// Indexed by raw version, then raw layer (reserved, III, II, I).
const SAMPLES_PER_FRAME: [[u32; 4]; 4] = [
    [0, 576, 1152, 384],  // MPEG 2.5
    [0, 0, 0, 0],         // reserved
    [0, 576, 1152, 384],  // MPEG 2
    [0, 1152, 1152, 384], // MPEG 1
];

// Bitrates in kbps, indexed by raw version, raw layer, then raw bitrate index.
// Index 0 is free format, index 15 is bad.
const BITRATES: [[[u32; 16]; 4]; 4] = [
    // MPEG 2.5
    [
        [0; 16],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
    ],
    // reserved
    [[0; 16], [0; 16], [0; 16], [0; 16]],
    // MPEG 2
    [
        [0; 16],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0],
    ],
    // MPEG 1
    [
        [0; 16],
        [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0],
        [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0],
        [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0],
    ],
];

// Indexed by raw layer (reserved, III, II, I).
const SLOT_SIZES: [u32; 4] = [0, 1, 1, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

/// Incrementally validated MPEG audio frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameHeader {
    raw: [u8; HEADER_SIZE],
    pos: usize,
}

impl FrameHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a complete header in one go.
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Option<Self> {
        let mut header = Self::new();
        for (i, &byte) in bytes.iter().enumerate() {
            let complete = header.update(byte);
            // A rejected byte restarts the match, which is a failure for a fixed window.
            if header.pos != i + 1 {
                return None;
            }
            if complete {
                return Some(header);
            }
        }
        None
    }

    /// Feeds the next byte of the stream.
    ///
    /// Returns `true` once four consecutive bytes form a structurally valid header. A byte
    /// that breaks the current candidate is retried as the first byte of a new one.
    pub fn update(&mut self, byte: u8) -> bool {
        if self.is_valid() {
            self.reset();
        }
        if !self.accept(byte) {
            self.reset();
            if !self.accept(byte) {
                self.reset();
            }
        }
        self.is_valid()
    }

    fn accept(&mut self, byte: u8) -> bool {
        let pos = self.pos;
        self.raw[pos] = byte;
        self.pos += 1;
        self.is_valid_at(pos)
    }

    fn is_valid_at(&self, pos: usize) -> bool {
        match pos {
            SYNC1 => self.raw[SYNC1] == 0xFF,
            SYNC2_VERSION_LAYER_PROTECTION => {
                self.sync2() == 0x7
                    && self.raw_version() != RAW_VERSION_RESERVED
                    && self.raw_layer() != RAW_LAYER_RESERVED
            }
            BITRATE_SAMPLERATE_PADDING_PRIVATE => self.raw_bitrate() != RAW_BITRATE_BAD,
            _ => true,
        }
    }

    /// Whether all four bytes have been accepted.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pos >= HEADER_SIZE
    }

    /// Number of bytes of the current candidate accepted so far.
    #[inline]
    pub fn matched_len(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    #[inline]
    pub fn raw(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }

    #[inline]
    fn sync2(&self) -> u8 {
        (self.raw[SYNC2_VERSION_LAYER_PROTECTION] >> 5) & 0x7
    }

    #[inline]
    pub fn raw_version(&self) -> u8 {
        (self.raw[SYNC2_VERSION_LAYER_PROTECTION] >> 3) & 0x3
    }

    #[inline]
    pub fn raw_layer(&self) -> u8 {
        (self.raw[SYNC2_VERSION_LAYER_PROTECTION] >> 1) & 0x3
    }

    #[inline]
    pub fn raw_protection(&self) -> u8 {
        self.raw[SYNC2_VERSION_LAYER_PROTECTION] & 0x1
    }

    #[inline]
    pub fn raw_bitrate(&self) -> u8 {
        (self.raw[BITRATE_SAMPLERATE_PADDING_PRIVATE] >> 4) & 0xF
    }

    #[inline]
    pub fn raw_sample_rate(&self) -> u8 {
        (self.raw[BITRATE_SAMPLERATE_PADDING_PRIVATE] >> 2) & 0x3
    }

    #[inline]
    pub fn padding(&self) -> u8 {
        (self.raw[BITRATE_SAMPLERATE_PADDING_PRIVATE] >> 1) & 0x1
    }

    #[inline]
    pub fn private(&self) -> u8 {
        self.raw[BITRATE_SAMPLERATE_PADDING_PRIVATE] & 0x1
    }

    #[inline]
    pub fn raw_channel_mode(&self) -> u8 {
        (self.raw[CHANNELMODE_MODEEXT_COPY_ORIG_EMPH] >> 6) & 0x3
    }

    /// A cleared protection bit means a 16 bit CRC follows the header.
    #[inline]
    pub fn has_crc(&self) -> bool {
        self.raw_protection() == 0
    }

    pub fn version(&self) -> Option<MpegVersion> {
        match self.raw_version() {
            0 => Some(MpegVersion::Mpeg25),
            2 => Some(MpegVersion::Mpeg2),
            3 => Some(MpegVersion::Mpeg1),
            _ => None,
        }
    }

    pub fn layer(&self) -> Option<Layer> {
        match self.raw_layer() {
            1 => Some(Layer::Layer3),
            2 => Some(Layer::Layer2),
            3 => Some(Layer::Layer1),
            _ => None,
        }
    }

    /// Sample rate in Hz, 0 for reserved combinations.
    pub fn sample_rate(&self) -> SampleRate {
        SAMPLE_RATES[self.raw_version() as usize][self.raw_sample_rate() as usize]
    }

    pub fn channels(&self) -> ChannelCount {
        if self.raw_channel_mode() == 3 {
            1
        } else {
            2
        }
    }

    pub fn samples_per_frame(&self) -> u32 {
        SAMPLES_PER_FRAME[self.raw_version() as usize][self.raw_layer() as usize]
    }

    /// Bitrate in bits per second, 0 for free format and invalid combinations.
    pub fn bitrate(&self) -> u32 {
        1000 * BITRATES[self.raw_version() as usize][self.raw_layer() as usize]
            [self.raw_bitrate() as usize]
    }

    /// Padding granularity in bytes.
    pub fn slot_size(&self) -> u32 {
        SLOT_SIZES[self.raw_layer() as usize]
    }
}

/// A located MPEG audio frame, identified by its header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Total frame size in bytes, header included.
    ///
    /// Zero when no complete header has been matched or the header does not describe a
    /// measurable frame (reserved sample rate, free format bitrate).
    pub fn length(&self) -> u32 {
        let header = &self.header;
        if !header.is_valid() {
            return 0;
        }
        let sample_rate = header.sample_rate() as u64;
        let bitrate = header.bitrate() as u64;
        let slot_size = header.slot_size() as u64;
        if sample_rate == 0 || bitrate == 0 || slot_size == 0 {
            return 0;
        }
        // Bytes per frame expressed in slots, then padded by one slot.
        let slots_per_frame = header.samples_per_frame() as u64 / 8 / slot_size;
        let len = (slots_per_frame * bitrate / sample_rate + header.padding() as u64) * slot_size;
        len as u32
    }

    /// Feeds the next byte to the header validator, see [`FrameHeader::update`].
    #[inline]
    pub fn parse_next(&mut self, byte: u8) -> bool {
        self.header.update(byte)
    }

    #[inline]
    pub fn reset(&mut self) {
        self.header.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // MPEG1 Layer3, no CRC, 128kbps, 44100Hz, no padding, stereo.
    const HEADER_128K: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    fn frame_from(bytes: [u8; 4]) -> Frame {
        let mut frame = Frame::new();
        let mut complete = false;
        for byte in bytes {
            complete = frame.parse_next(byte);
        }
        assert!(complete, "{bytes:02X?} should be a valid header");
        frame
    }

    #[test]
    fn decodes_mpeg1_layer3() {
        let header = FrameHeader::from_bytes(HEADER_128K).unwrap();
        assert_eq!(header.version(), Some(MpegVersion::Mpeg1));
        assert_eq!(header.layer(), Some(Layer::Layer3));
        assert!(!header.has_crc());
        assert_eq!(header.bitrate(), 128_000);
        assert_eq!(header.sample_rate(), 44_100);
        assert_eq!(header.channels(), 2);
        assert_eq!(header.samples_per_frame(), 1152);
        assert_eq!(header.slot_size(), 1);
        assert_eq!(header.padding(), 0);
    }

    #[test]
    fn frame_length() {
        // floor(144 * 128000 / 44100) = 417
        assert_eq!(frame_from(HEADER_128K).length(), 417);
        // padded
        assert_eq!(frame_from([0xFF, 0xFB, 0x92, 0x00]).length(), 418);
        // 320kbps at 48kHz: 144 * 320000 / 48000 = 960
        assert_eq!(frame_from([0xFF, 0xFB, 0xE4, 0x00]).length(), 960);
        // MPEG2 Layer3 64kbps at 22050Hz: 72 * 64000 / 22050 = 208
        assert_eq!(frame_from([0xFF, 0xF3, 0x80, 0x00]).length(), 208);
        // MPEG1 Layer1 32kbps at 44100Hz: (12 * 32000 / 44100 + 1) * 4 = 36
        assert_eq!(frame_from([0xFF, 0xFF, 0x12, 0x00]).length(), 36);
    }

    #[test]
    fn mono_channel_mode() {
        let header = FrameHeader::from_bytes([0xFF, 0xFB, 0x90, 0xC0]).unwrap();
        assert_eq!(header.channels(), 1);
        let header = FrameHeader::from_bytes([0xFF, 0xFB, 0x90, 0x40]).unwrap();
        assert_eq!(header.channels(), 2);
    }

    #[test]
    fn lower_sampling_frequency_versions() {
        let header = FrameHeader::from_bytes([0xFF, 0xF3, 0x90, 0x00]).unwrap();
        assert_eq!(header.version(), Some(MpegVersion::Mpeg2));
        assert_eq!(header.sample_rate(), 22_050);
        assert_eq!(header.samples_per_frame(), 576);

        let header = FrameHeader::from_bytes([0xFF, 0xE3, 0x90, 0x00]).unwrap();
        assert_eq!(header.version(), Some(MpegVersion::Mpeg25));
        assert_eq!(header.sample_rate(), 11_025);
    }

    #[test]
    fn rejects_structurally_invalid_headers() {
        // no sync
        assert!(FrameHeader::from_bytes([0x00, 0x00, 0x00, 0x00]).is_none());
        assert!(FrameHeader::from_bytes([0xFF, 0x00, 0x90, 0x00]).is_none());
        // reserved version
        assert!(FrameHeader::from_bytes([0xFF, 0xE8, 0x90, 0x00]).is_none());
        // reserved layer
        assert!(FrameHeader::from_bytes([0xFF, 0xF9, 0x90, 0x00]).is_none());
        // bad bitrate index
        assert!(FrameHeader::from_bytes([0xFF, 0xFB, 0xF0, 0x00]).is_none());
    }

    #[test]
    fn unmeasurable_headers_have_no_length() {
        // Reserved sample rate index is structurally accepted but has no length.
        let frame = frame_from([0xFF, 0xFB, 0x9C, 0x00]);
        assert_eq!(frame.header().sample_rate(), 0);
        assert_eq!(frame.length(), 0);

        // Free format.
        let frame = frame_from([0xFF, 0xFB, 0x00, 0x00]);
        assert_eq!(frame.header().bitrate(), 0);
        assert_eq!(frame.length(), 0);

        assert_eq!(Frame::new().length(), 0);
    }

    #[test]
    fn rejected_byte_starts_a_new_candidate() {
        let mut header = FrameHeader::new();
        // 0xFF at position 2 carries the bad bitrate index, but is a valid sync byte.
        let stream = [0xFF, 0xFB, 0xFF, 0xFB, 0x90, 0x00];
        let results: Vec<bool> = stream.iter().map(|&b| header.update(b)).collect();
        assert_eq!(results, [false, false, false, false, false, true]);
        assert_eq!(header.raw(), &HEADER_128K);
    }

    #[test]
    fn skips_leading_garbage() {
        let mut header = FrameHeader::new();
        let stream = [0x00, 0xFF, 0x12, 0xFF, 0xFB, 0x90, 0x00];
        let found = stream.iter().position(|&b| header.update(b));
        assert_eq!(found, Some(6));
        assert_eq!(header.raw(), &HEADER_128K);
    }

    #[test]
    fn completed_header_restarts_on_next_byte() {
        let mut header = FrameHeader::from_bytes(HEADER_128K).unwrap();
        assert!(!header.update(0xFF));
        assert_eq!(header.matched_len(), 1);
    }

    #[test]
    fn bitrate_table_mpeg1_layer3() {
        let expected = [32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
        for (index, kbps) in (1u8..=14).zip(expected) {
            let header = FrameHeader::from_bytes([0xFF, 0xFB, index << 4, 0x00]).unwrap();
            assert_eq!(header.bitrate(), kbps * 1000, "index {index}");
        }
    }
}
