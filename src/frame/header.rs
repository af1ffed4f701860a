//! Frame header layout
//!
//! ```text
//! magic:u32le  flags:u8  window_log:u8  [dict_id:u32le]  [content_size:1|2|4|8 bytes]
//!
//! flags  bit0    content checksum present
//!        bit1    dictionary id present
//!        bit2    content size present
//!        bit3-4  content size width (0:1, 1:2, 2:4, 3:8 bytes)
//!        bit5-7  reserved, must be zero
//! ```

use crate::bitio::{write_uint_le, ByteCursor};
use crate::common::{FRAME_MAGIC, MIN_FRAME_HEADER_SIZE};
use crate::{CodecError, Result};

const FLAG_CHECKSUM: u8 = 0x01;
const FLAG_DICT_ID: u8 = 0x02;
const FLAG_CONTENT_SIZE: u8 = 0x04;
const SIZE_WIDTH_SHIFT: u8 = 3;
const RESERVED_FLAGS: u8 = 0xE0;

/// Smallest window log a frame may declare
const FRAME_WINDOW_LOG_MIN: u8 = 10;

/// Largest window log a frame may declare
const FRAME_WINDOW_LOG_MAX: u8 = 31;

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// A content checksum follows the last block
    pub has_checksum: bool,
    /// Dictionary the frame was compressed with
    pub dictionary_id: Option<u32>,
    /// Uncompressed content size, when known up front
    pub content_size: Option<u64>,
    /// Log2 of the window needed to decode the frame
    pub window_log: u8,
}

impl FrameHeader {
    /// Window size in bytes
    pub fn window_size(&self) -> u64 {
        1u64 << self.window_log
    }

    /// Serialized size of this header
    pub fn encoded_len(&self) -> usize {
        MIN_FRAME_HEADER_SIZE
            + if self.dictionary_id.is_some() { 4 } else { 0 }
            + self.content_size.map_or(0, |size| size_width(size).1)
    }

    /// Append the serialized header
    pub fn write(&self, out: &mut Vec<u8>) {
        let mut flags = 0u8;
        if self.has_checksum {
            flags |= FLAG_CHECKSUM;
        }
        if self.dictionary_id.is_some() {
            flags |= FLAG_DICT_ID;
        }
        let size_field = self.content_size.map(size_width);
        if let Some((code, _)) = size_field {
            flags |= FLAG_CONTENT_SIZE | (code << SIZE_WIDTH_SHIFT);
        }

        out.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        out.push(flags);
        out.push(self.window_log);
        if let Some(id) = self.dictionary_id {
            out.extend_from_slice(&id.to_le_bytes());
        }
        if let (Some(size), Some((_, width))) = (self.content_size, size_field) {
            write_uint_le(out, size, width);
        }
    }

    /// Parse a header from the start of `data`
    ///
    /// Returns `Ok(None)` when more bytes are needed, otherwise the header
    /// and the number of bytes it occupies. A wrong magic number or
    /// reserved flag bits are rejected as soon as enough bytes are present.
    pub fn parse(data: &[u8]) -> Result<Option<(Self, usize)>> {
        if data.len() >= 4 {
            let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
            if magic != FRAME_MAGIC {
                return Err(CodecError::corrupt(format!(
                    "bad frame magic {magic:#010x}"
                )));
            }
        }
        if data.len() < MIN_FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let flags = data[4];
        if flags & RESERVED_FLAGS != 0 {
            return Err(CodecError::corrupt(format!(
                "reserved frame flag bits set ({flags:#04x})"
            )));
        }
        let window_log = data[5];
        if !(FRAME_WINDOW_LOG_MIN..=FRAME_WINDOW_LOG_MAX).contains(&window_log) {
            return Err(CodecError::corrupt(format!(
                "frame window log {window_log} out of range"
            )));
        }

        let has_dict = flags & FLAG_DICT_ID != 0;
        let has_size = flags & FLAG_CONTENT_SIZE != 0;
        let width = 1usize << ((flags >> SIZE_WIDTH_SHIFT) & 0x03);
        if !has_size && (flags >> SIZE_WIDTH_SHIFT) & 0x03 != 0 {
            return Err(CodecError::corrupt("content size width without content size"));
        }
        let total = MIN_FRAME_HEADER_SIZE
            + if has_dict { 4 } else { 0 }
            + if has_size { width } else { 0 };
        if data.len() < total {
            return Ok(None);
        }

        let mut cursor = ByteCursor::new(&data[MIN_FRAME_HEADER_SIZE..total]);
        let dictionary_id = if has_dict {
            Some(cursor.read_u32_le()?)
        } else {
            None
        };
        let content_size = if has_size {
            Some(cursor.read_uint_le(width)?)
        } else {
            None
        };

        Ok(Some((
            Self {
                has_checksum: flags & FLAG_CHECKSUM != 0,
                dictionary_id,
                content_size,
                window_log,
            },
            total,
        )))
    }
}

/// Narrowest width code and byte width able to hold `size`
fn size_width(size: u64) -> (u8, usize) {
    if size <= u8::MAX as u64 {
        (0, 1)
    } else if size <= u16::MAX as u64 {
        (1, 2)
    } else if size <= u32::MAX as u64 {
        (2, 4)
    } else {
        (3, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(content_size: Option<u64>, dictionary_id: Option<u32>) -> FrameHeader {
        FrameHeader {
            has_checksum: true,
            dictionary_id,
            content_size,
            window_log: 20,
        }
    }

    #[test]
    fn test_content_size_widths() {
        for (size, width) in [(0u64, 1usize), (255, 1), (256, 2), (70_000, 4), (1 << 33, 8)] {
            let h = header(Some(size), None);
            let mut out = Vec::new();
            h.write(&mut out);
            assert_eq!(out.len(), MIN_FRAME_HEADER_SIZE + width);
            assert_eq!(out.len(), h.encoded_len());
            assert_eq!(FrameHeader::parse(&out).unwrap(), Some((h, out.len())));
        }
    }

    #[test]
    fn test_minimal_header_bytes() {
        let h = FrameHeader {
            has_checksum: false,
            dictionary_id: None,
            content_size: None,
            window_log: 10,
        };
        let mut out = Vec::new();
        h.write(&mut out);
        assert_eq!(hex::encode(&out), "5a434631000a");
    }

    #[test]
    fn test_incremental_parse() {
        let h = header(Some(1000), Some(0x8000_1234));
        let mut out = Vec::new();
        h.write(&mut out);
        for cut in 0..out.len() {
            assert_eq!(FrameHeader::parse(&out[..cut]).unwrap(), None);
        }
        assert!(FrameHeader::parse(&out).unwrap().is_some());
    }

    #[test]
    fn test_rejects_bad_magic_and_flags() {
        assert!(FrameHeader::parse(b"ZSTD").is_err());

        let mut out = Vec::new();
        header(None, None).write(&mut out);
        out[4] |= 0x80;
        assert!(matches!(
            FrameHeader::parse(&out),
            Err(CodecError::CorruptStream(_))
        ));

        let mut out = Vec::new();
        header(None, None).write(&mut out);
        out[5] = 40;
        assert!(FrameHeader::parse(&out).is_err());
    }
}
