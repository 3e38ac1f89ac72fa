//! ID3v2 tag header detection.
//!
//! An ID3v2 tag may precede the first audio frame. Only its 10 byte header is decoded, which
//! is enough to know how many bytes to skip:
//!
//! ```text
//! "ID3" | major version | minor version | flags | size (4 x 7 bit, synchsafe)
//! ```

/// Size of an ID3v2 tag header in bytes. An ID3v2.4 footer has the same size.
pub const ID3_HEADER_SIZE: usize = 10;

const ID: &[u8; 3] = b"ID3";
const MAJOR_VERSION: usize = 3;
const MINOR_VERSION: usize = 4;
const FLAGS: usize = 5;
const FLAGS_END: usize = 6;

const FOOTER_PRESENT: u8 = 0x10;

/// Incrementally validated ID3v2 tag header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Id3Header {
    raw: [u8; ID3_HEADER_SIZE],
    pos: usize,
    size: u32,
}

impl Id3Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next byte, returns `true` once the full header has been accepted.
    ///
    /// Works like [`FrameHeader::update`](super::FrameHeader::update): a byte that breaks
    /// the current candidate is retried as the start of a new one.
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
        if pos >= FLAGS_END {
            // Synchsafe: only the low 7 bits of each size byte count.
            self.size = (self.size << 7) | (byte & 0x7F) as u32;
        }
        self.raw[pos] = byte;
        self.pos += 1;
        self.is_valid_at(pos)
    }

    fn is_valid_at(&self, pos: usize) -> bool {
        let byte = self.raw[pos];
        match pos {
            0 | 1 | 2 => ID[pos] == byte,
            MAJOR_VERSION | MINOR_VERSION => byte != 0xFF,
            FLAGS => true,
            _ => byte < 0x80,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.pos >= ID3_HEADER_SIZE
    }

    /// Number of bytes of the current candidate accepted so far.
    #[inline]
    pub fn matched_len(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.size = 0;
    }

    #[inline]
    pub fn major_version(&self) -> u8 {
        self.raw[MAJOR_VERSION]
    }

    #[inline]
    pub fn minor_version(&self) -> u8 {
        self.raw[MINOR_VERSION]
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        self.raw[FLAGS]
    }

    /// Declared tag size, excluding the header itself and any footer. 0 unless valid.
    pub fn size(&self) -> u32 {
        if self.is_valid() {
            self.size
        } else {
            0
        }
    }

    /// Number of bytes the whole tag occupies in the stream, header and footer included.
    pub fn total_size(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        let footer = if self.major_version() >= 4 && self.flags() & FOOTER_PRESENT != 0 {
            ID3_HEADER_SIZE as u64
        } else {
            0
        };
        ID3_HEADER_SIZE as u64 + self.size as u64 + footer
    }
}

/// Outcome of feeding one byte to [`Id3Parser::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Id3Probe {
    /// The bytes so far are a prefix of a tag header.
    Partial,
    /// A complete tag header has been matched.
    Found,
    /// The byte does not continue the tag header started at the first probed byte.
    Mismatch,
}

/// Detects the ID3v2 tag header at the start of a stream.
#[derive(Debug, Clone, Default)]
pub struct Id3Parser {
    header: Id3Header,
}

impl Id3Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next stream byte, requiring the header to start at the first probed byte.
    pub fn probe(&mut self, byte: u8) -> Id3Probe {
        let expected = self.header.matched_len() + 1;
        let complete = self.header.update(byte);
        if self.header.matched_len() != expected {
            self.header.reset();
            Id3Probe::Mismatch
        } else if complete {
            Id3Probe::Found
        } else {
            Id3Probe::Partial
        }
    }

    #[inline]
    pub fn header(&self) -> &Id3Header {
        &self.header
    }

    pub fn reset(&mut self) {
        self.header.reset();
    }
}
