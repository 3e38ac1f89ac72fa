//! Xing/Info and VBRI headers.
//!
//! Encoders store stream level information in the payload of the first frame. Both known
//! layouts carry the number of audio frames in the stream, which gives an exact duration for
//! variable bitrate files.
//!
//! - VBRI (Fraunhofer) sits at a fixed offset, 32 bytes after the frame header.
//! - Xing (or `Info` for constant bitrate LAME files) sits after the side information, whose
//!   size depends on version and channel mode, so its tag is searched for.

use super::frame::HEADER_SIZE;

const XING_TAG: &[u8; 4] = b"Xing";
const INFO_TAG: &[u8; 4] = b"Info";
const VBRI_TAG: &[u8; 4] = b"VBRI";

const XING_FRAMES: u32 = 0x01;
const XING_BYTES: u32 = 0x02;
const XING_TOC: u32 = 0x04;
const XING_SCALE: u32 = 0x08;

/// Number of entries in a Xing table of contents.
pub const TOC_SIZE: usize = 100;

const VBRI_OFFSET: usize = 32 + HEADER_SIZE;
const VBRI_BYTES_OFFSET: usize = VBRI_OFFSET + 10;
const VBRI_FRAMES_OFFSET: usize = VBRI_OFFSET + 14;
const VBRI_MIN_FRAME_SIZE: usize = VBRI_OFFSET + 26;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VbrHeaderType {
    #[default]
    None,
    Xing,
    Vbri,
}

/// Stream information found in the first frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VbrHeader {
    kind: VbrHeaderType,
    num_frames: Option<u32>,
    num_bytes: Option<u32>,
    toc: Option<Box<[u8; TOC_SIZE]>>,
    scale: Option<u32>,
}

#[inline]
fn read_u32_be(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

impl VbrHeader {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn kind(&self) -> VbrHeaderType {
        self.kind
    }

    /// Number of audio frames in the stream, if the header declares it.
    #[inline]
    pub fn num_frames(&self) -> Option<u32> {
        self.num_frames
    }

    /// Number of bytes of audio in the stream, if the header declares it.
    #[inline]
    pub fn num_bytes(&self) -> Option<u32> {
        self.num_bytes
    }

    /// The Xing seek table, entry `i` is the byte position at `i` percent of the duration,
    /// in 1/256ths of [`num_bytes`](Self::num_bytes).
    pub fn toc(&self) -> Option<&[u8; TOC_SIZE]> {
        self.toc.as_deref()
    }

    /// Xing quality indicator, 0 (best) to 100 (worst).
    #[inline]
    pub fn scale(&self) -> Option<u32> {
        self.scale
    }

    /// Looks for a VBR header in a complete frame, header included.
    ///
    /// VBRI is tried first as it only needs a single comparison. Returns whether a header
    /// was found.
    pub fn parse(&mut self, frame: &[u8]) -> bool {
        let found = self.parse_vbri(frame) || self.parse_xing(frame);
        #[cfg(feature = "tracing")]
        if found {
            tracing::debug!(
                kind = ?self.kind,
                num_frames = ?self.num_frames,
                num_bytes = ?self.num_bytes,
                "found VBR header"
            );
        }
        found
    }

    fn parse_vbri(&mut self, frame: &[u8]) -> bool {
        if frame.len() < VBRI_MIN_FRAME_SIZE
            || &frame[VBRI_OFFSET..VBRI_OFFSET + VBRI_TAG.len()] != VBRI_TAG
        {
            return false;
        }
        *self = VbrHeader {
            kind: VbrHeaderType::Vbri,
            num_frames: read_u32_be(frame, VBRI_FRAMES_OFFSET),
            num_bytes: read_u32_be(frame, VBRI_BYTES_OFFSET),
            toc: None,
            scale: None,
        };
        true
    }

    fn parse_xing(&mut self, frame: &[u8]) -> bool {
        // Tag and flags must both be present.
        let Some(tag_pos) = frame
            .windows(8)
            .position(|w| &w[..4] == XING_TAG || &w[..4] == INFO_TAG)
        else {
            return false;
        };
        let Some(flags) = read_u32_be(frame, tag_pos + 4) else {
            return false;
        };

        let mut header = VbrHeader {
            kind: VbrHeaderType::Xing,
            ..Default::default()
        };
        // Optional fields follow in flag order.
        let mut offset = tag_pos + 8;
        if flags & XING_FRAMES != 0 {
            header.num_frames = read_u32_be(frame, offset);
            offset += 4;
        }
        if flags & XING_BYTES != 0 {
            header.num_bytes = read_u32_be(frame, offset);
            offset += 4;
        }
        if flags & XING_TOC != 0 {
            header.toc = frame
                .get(offset..offset + TOC_SIZE)
                .and_then(|toc| <[u8; TOC_SIZE]>::try_from(toc).ok())
                .map(Box::new);
            offset += TOC_SIZE;
        }
        if flags & XING_SCALE != 0 {
            header.scale = read_u32_be(frame, offset);
        }
        *self = header;
        true
    }

    /// Byte offset, relative to the first frame, of the position at `fraction` (0 to 1) of
    /// the stream duration, interpolated from the table of contents.
    pub fn offset_for(&self, fraction: f64) -> Option<u64> {
        let toc = self.toc.as_deref()?;
        let num_bytes = self.num_bytes? as f64;
        let percent = (fraction * 100.0).clamp(0.0, 100.0);
        let index = (percent as usize).min(TOC_SIZE - 1);
        let low = toc[index] as f64;
        let high = if index + 1 < TOC_SIZE {
            toc[index + 1] as f64
        } else {
            256.0
        };
        let position = low + (high - low) * (percent - index as f64);
        Some((position / 256.0 * num_bytes) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];

    fn frame_with(len: usize, at: usize, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; len];
        frame[..4].copy_from_slice(&HEADER);
        frame[at..at + payload.len()].copy_from_slice(payload);
        frame
    }

    fn xing(flags: u32, fields: &[u8]) -> Vec<u8> {
        let mut xing = b"Xing".to_vec();
        xing.extend_from_slice(&flags.to_be_bytes());
        xing.extend_from_slice(fields);
        xing
    }

    fn vbri(num_bytes: u32, num_frames: u32) -> Vec<u8> {
        let mut vbri = b"VBRI".to_vec();
        vbri.extend_from_slice(&[0, 1, 0, 0, 0, 75]);
        vbri.extend_from_slice(&num_bytes.to_be_bytes());
        vbri.extend_from_slice(&num_frames.to_be_bytes());
        vbri
    }

    #[test]
    fn no_header() {
        let mut header = VbrHeader::new();
        assert!(!header.parse(&frame_with(417, 0, &[])));
        assert_eq!(header.kind(), VbrHeaderType::None);
        assert_eq!(header.num_frames(), None);
    }

    #[test]
    fn xing_frame_count() {
        let frame = frame_with(417, 36, &xing(XING_FRAMES, &1234u32.to_be_bytes()));
        let mut header = VbrHeader::new();
        assert!(header.parse(&frame));
        assert_eq!(header.kind(), VbrHeaderType::Xing);
        assert_eq!(header.num_frames(), Some(1234));
        assert_eq!(header.num_bytes(), None);
        assert!(header.toc().is_none());
    }

    #[test]
    fn xing_without_frame_count() {
        let frame = frame_with(417, 21, &xing(XING_BYTES, &99u32.to_be_bytes()));
        let mut header = VbrHeader::new();
        assert!(header.parse(&frame));
        assert_eq!(header.kind(), VbrHeaderType::Xing);
        assert_eq!(header.num_frames(), None);
        assert_eq!(header.num_bytes(), Some(99));
    }

    #[test]
    fn xing_all_fields() {
        let mut fields = Vec::new();
        fields.extend_from_slice(&500u32.to_be_bytes());
        fields.extend_from_slice(&100_000u32.to_be_bytes());
        fields.extend((0..100u32).map(|i| (i * 256 / 100) as u8));
        fields.extend_from_slice(&57u32.to_be_bytes());
        let flags = XING_FRAMES | XING_BYTES | XING_TOC | XING_SCALE;
        let frame = frame_with(417, 36, &xing(flags, &fields));

        let mut header = VbrHeader::new();
        assert!(header.parse(&frame));
        assert_eq!(header.num_frames(), Some(500));
        assert_eq!(header.num_bytes(), Some(100_000));
        assert_eq!(header.toc().map(|toc| toc[50]), Some(128));
        assert_eq!(header.scale(), Some(57));

        assert_eq!(header.offset_for(0.0), Some(0));
        assert_eq!(header.offset_for(0.5), Some(50_000));
        assert_eq!(header.offset_for(1.0), Some(100_000));
    }

    #[test]
    fn info_tag_uses_xing_layout() {
        let mut info = xing(XING_FRAMES, &42u32.to_be_bytes());
        info[..4].copy_from_slice(b"Info");
        let mut header = VbrHeader::new();
        assert!(header.parse(&frame_with(417, 36, &info)));
        assert_eq!(header.kind(), VbrHeaderType::Xing);
        assert_eq!(header.num_frames(), Some(42));
    }

    #[test]
    fn truncated_xing_is_ignored() {
        // Tag without room for the flags.
        let frame = frame_with(40, 34, b"Xing");
        let mut header = VbrHeader::new();
        assert!(!header.parse(&frame));
        assert_eq!(header.kind(), VbrHeaderType::None);
    }

    #[test]
    fn vbri_frame_count() {
        let frame = frame_with(417, VBRI_OFFSET, &vbri(4096, 321));
        let mut header = VbrHeader::new();
        assert!(header.parse(&frame));
        assert_eq!(header.kind(), VbrHeaderType::Vbri);
        assert_eq!(header.num_frames(), Some(321));
        assert_eq!(header.num_bytes(), Some(4096));
    }

    #[test]
    fn vbri_needs_a_full_block() {
        let frame = frame_with(VBRI_MIN_FRAME_SIZE - 1, VBRI_OFFSET, b"VBRI");
        let mut header = VbrHeader::new();
        assert!(!header.parse(&frame));
    }

    #[test]
    fn vbri_takes_precedence_over_xing() {
        let mut frame = frame_with(417, VBRI_OFFSET, &vbri(4096, 321));
        let decoy = xing(XING_FRAMES, &7u32.to_be_bytes());
        frame[200..200 + decoy.len()].copy_from_slice(&decoy);

        let mut header = VbrHeader::new();
        assert!(header.parse(&frame));
        assert_eq!(header.kind(), VbrHeaderType::Vbri);
        assert_eq!(header.num_frames(), Some(321));
    }
}
