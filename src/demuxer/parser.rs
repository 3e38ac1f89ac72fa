use super::frame::{Frame, HEADER_SIZE};
use super::id3::{Id3Header, Id3Parser, Id3Probe, ID3_HEADER_SIZE};
use super::vbr::VbrHeader;

/// Where the parser stands with respect to a leading ID3v2 tag.
#[derive(Debug, Clone, Copy)]
enum Id3State {
    /// Still matching the tag header. The bytes probed so far are kept so that they can be
    /// scanned for a frame header should the match fail.
    Pending {
        probed: [u8; ID3_HEADER_SIZE],
        len: usize,
    },
    /// A tag was found, this many bytes of its body remain to be skipped.
    Skipping(u64),
    /// No (further) tag handling, bytes go straight to the frame scanner.
    Done,
}

impl Id3State {
    const fn pending() -> Self {
        Id3State::Pending {
            probed: [0; ID3_HEADER_SIZE],
            len: 0,
        }
    }
}

/// Resumable scanner locating MPEG audio frames in a byte stream.
///
/// Bytes are fed in arbitrarily sized chunks through [`parse`](Self::parse). State carried
/// between calls (a partially matched header, the rest of an ID3 tag to skip) makes the
/// result independent of how the stream is split.
#[derive(Debug, Clone)]
pub struct FrameParser {
    frame: Frame,
    first_frame: Frame,
    id3: Id3Parser,
    id3_state: Id3State,
    vbr: VbrHeader,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        FrameParser {
            frame: Frame::new(),
            first_frame: Frame::new(),
            id3: Id3Parser::new(),
            id3_state: Id3State::pending(),
            vbr: VbrHeader::new(),
        }
    }

    /// Scans `data` for the next frame header.
    ///
    /// Returns the position of the header's first byte relative to the start of `data`, or
    /// `None` if more data is needed. The position is negative when the header started in
    /// a previous chunk.
    ///
    /// A leading ID3v2 tag is only looked for at the very start of the stream, before any
    /// frame has been found, and is skipped in full even when it spans several chunks.
    pub fn parse(&mut self, data: &[u8]) -> Option<isize> {
        let mut i = 0;

        if let Id3State::Pending { .. } = self.id3_state {
            if self.first_frame.header().is_valid() || self.id3.header().is_valid() {
                self.id3_state = Id3State::Done;
            }
        }

        while let Id3State::Pending { mut probed, mut len } = self.id3_state {
            let Some(&byte) = data.get(i) else {
                return None;
            };
            i += 1;
            match self.id3.probe(byte) {
                Id3Probe::Partial => {
                    probed[len] = byte;
                    len += 1;
                    self.id3_state = Id3State::Pending { probed, len };
                }
                Id3Probe::Found => {
                    let header = self.id3.header();
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        version = header.major_version(),
                        size = header.size(),
                        "found ID3v2 tag"
                    );
                    self.id3_state =
                        Id3State::Skipping(header.total_size() - ID3_HEADER_SIZE as u64);
                }
                Id3Probe::Mismatch => {
                    probed[len] = byte;
                    len += 1;
                    self.id3_state = Id3State::Done;
                    // Probed bytes may have come from earlier chunks, the last one is
                    // data[i - 1].
                    let base = i as isize - len as isize;
                    for (k, &byte) in probed[..len].iter().enumerate() {
                        if self.scan_byte(byte) {
                            return Some(base + k as isize + 1 - HEADER_SIZE as isize);
                        }
                    }
                }
            }
        }

        if let Id3State::Skipping(remaining) = self.id3_state {
            let available = (data.len() - i) as u64;
            if remaining > available {
                self.id3_state = Id3State::Skipping(remaining - available);
                return None;
            }
            i += remaining as usize;
            self.id3_state = Id3State::Done;
        }

        for (j, &byte) in data[i..].iter().enumerate() {
            if self.scan_byte(byte) {
                return Some((i + j + 1) as isize - HEADER_SIZE as isize);
            }
        }
        None
    }

    /// Feeds one byte to the frame header validator, returns `true` on a usable frame.
    fn scan_byte(&mut self, byte: u8) -> bool {
        if !self.frame.parse_next(byte) {
            return false;
        }
        if self.frame.length() == 0 {
            // Free format or reserved sample rate: nothing we can measure, keep looking.
            self.frame.reset();
            return false;
        }
        if !self.first_frame.header().is_valid() {
            self.first_frame = self.frame;
        }
        true
    }

    /// Prepares for locating the next frame.
    ///
    /// A tag header that was captured is kept, so the stream is never probed for one again.
    pub fn end_frame_session(&mut self) {
        self.frame.reset();
        if !self.id3.header().is_valid() {
            self.id3.reset();
            self.id3_state = Id3State::pending();
        }
    }

    /// Looks for a Xing or VBRI header in the given frame, see [`VbrHeader::parse`].
    pub fn parse_vbr_header(&mut self, frame: &[u8]) -> bool {
        self.vbr.parse(frame)
    }

    #[inline]
    pub fn vbr_info(&self) -> &VbrHeader {
        &self.vbr
    }

    /// The frame most recently located by [`parse`](Self::parse).
    #[inline]
    pub fn current_frame(&self) -> &Frame {
        &self.frame
    }

    /// The first frame ever located in the stream.
    #[inline]
    pub fn first_frame(&self) -> &Frame {
        &self.first_frame
    }

    /// The leading ID3v2 tag header, if the stream has one.
    pub fn id3_header(&self) -> Option<&Id3Header> {
        let header = self.id3.header();
        header.is_valid().then_some(header)
    }

    /// Forgets everything learnt about the stream.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
