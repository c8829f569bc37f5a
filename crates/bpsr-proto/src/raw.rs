//! Flat fragment iterator for consumers that inspect raw bodies themselves.
//!
//! The trading extractor does not need Notify parsing or nested descent: it
//! walks the top level of the capture only and interprets FrameDown bodies
//! on its own. This iterator applies the same single-byte resync discipline
//! as the Notify parser but yields every fragment type untouched.

use crate::header::FrameHeader;

/// One top-level fragment, body unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Byte offset of the frame header in the capture.
    pub offset: u64,
    /// Total frame length in bytes, header included.
    pub length: u32,
    /// The 15-bit fragment type code.
    pub fragment_code: u16,
    /// Whether the compression flag bit is set; the body is NOT decompressed
    /// here.
    pub is_compressed: bool,
    /// Frame body: everything after the 6-byte header. Empty for frames whose
    /// declared length is shorter than the header.
    pub body: &'a [u8],
}

/// Walk the top-level fragments of `data`.
#[must_use]
pub fn iter_raw_frames(data: &[u8]) -> RawFrames<'_> {
    RawFrames { data, offset: 0 }
}

/// Iterator over the top-level fragments of a capture buffer.
#[derive(Debug)]
pub struct RawFrames<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Iterator for RawFrames<'a> {
    type Item = RawFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset + FrameHeader::SIZE <= self.data.len() {
            let header = FrameHeader::from_prefix(&self.data[self.offset..])?;

            let length = header.length() as usize;
            if length == 0 || self.offset + length > self.data.len() {
                // Same byte-slide discipline as the Notify parser.
                self.offset += 1;
                continue;
            }

            let body_start = (self.offset + FrameHeader::SIZE).min(self.offset + length);
            let frame = RawFrame {
                offset: self.offset as u64,
                length: header.length(),
                fragment_code: header.fragment_code(),
                is_compressed: header.is_compressed(),
                body: &self.data[body_start..self.offset + length],
            };
            self.offset += length;
            return Some(frame);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use bytes::BufMut;

    use super::*;
    use crate::header::FragmentType;

    fn frame(fragment_code: u16, compressed: bool, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u32((body.len() + FrameHeader::SIZE) as u32);
        let mut pkt_type = fragment_code;
        if compressed {
            pkt_type |= FrameHeader::ZSTD_FLAG;
        }
        out.put_u16(pkt_type);
        out.put_slice(body);
        out
    }

    #[test]
    fn yields_every_fragment_type() {
        let mut data = frame(FragmentType::NOTIFY, false, b"notify body here");
        data.extend(frame(FragmentType::FRAME_DOWN, true, b"\x00\x00\x00\x01rest"));
        data.extend(frame(0x0042, false, b""));

        let frames: Vec<_> = iter_raw_frames(&data).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].fragment_code, FragmentType::NOTIFY);
        assert!(!frames[0].is_compressed);
        assert_eq!(frames[0].body, b"notify body here");
        assert_eq!(frames[1].fragment_code, FragmentType::FRAME_DOWN);
        assert!(frames[1].is_compressed);
        assert_eq!(frames[2].fragment_code, 0x0042);
        assert!(frames[2].body.is_empty());
    }

    #[test]
    fn offsets_are_absolute() {
        let first = frame(FragmentType::FRAME_DOWN, false, b"\x00\x00\x00\x01ab");
        let mut data = first.clone();
        data.extend(frame(FragmentType::FRAME_DOWN, false, b"\x00\x00\x00\x02cd"));

        let offsets: Vec<u64> = iter_raw_frames(&data).map(|frame| frame.offset).collect();
        assert_eq!(offsets, vec![0, first.len() as u64]);
    }

    #[test]
    fn slides_over_garbage() {
        let valid = frame(FragmentType::FRAME_DOWN, false, b"\x00\x00\x00\x01ok");
        let mut data = vec![0xFF_u8; 3];
        data.extend_from_slice(&valid);

        let frames: Vec<_> = iter_raw_frames(&data).collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].offset, 3);
    }

    #[test]
    fn tiny_declared_length_yields_empty_body() {
        // length=3 is shorter than the header; the walker still advances by
        // the declared length and reports an empty body.
        let mut data = vec![0x00, 0x00, 0x00, 0x03, 0x00, 0x06];
        data.extend(frame(FragmentType::NOTIFY, false, b"0123456789abcdef"));

        let frames: Vec<_> = iter_raw_frames(&data).collect();
        assert!(!frames.is_empty());
        assert!(frames[0].body.is_empty());
        assert_eq!(frames[0].length, 3);
    }
}
