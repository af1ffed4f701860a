//! Frame and block format
//!
//! A frame is a header, one or more blocks and an optional checksum
//! trailer. Only the last block carries the `last` flag. Helpers here
//! inspect frames without decoding them.

mod block;
mod header;

pub use block::{BlockHeader, BlockKind, Sequence};
pub use header::FrameHeader;

use crate::common::{BLOCK_HEADER_SIZE, CHECKSUM_SIZE};
use crate::{CodecError, Result};

/// Header-level facts about a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Uncompressed size, if the frame records it
    pub content_size: Option<u64>,
    /// Dictionary id, if the frame records one
    pub dictionary_id: Option<u32>,
    /// True if a content checksum trails the frame
    pub has_checksum: bool,
    /// Window size needed to decode the frame
    pub window_size: u64,
    /// Size of the frame header in bytes
    pub header_size: usize,
}

/// Read the header of the frame at the start of `data`
pub fn get_frame_info(data: &[u8]) -> Result<FrameInfo> {
    let (header, header_size) = FrameHeader::parse(data)?
        .ok_or_else(|| CodecError::corrupt("truncated frame header"))?;
    Ok(FrameInfo {
        content_size: header.content_size,
        dictionary_id: header.dictionary_id,
        has_checksum: header.has_checksum,
        window_size: header.window_size(),
        header_size,
    })
}

/// Compressed size of the first frame in `data`, trailer included
pub fn get_frame_size(data: &[u8]) -> Result<usize> {
    let info = get_frame_info(data)?;
    let mut pos = info.header_size;
    loop {
        let bytes = data
            .get(pos..pos + BLOCK_HEADER_SIZE)
            .ok_or_else(|| CodecError::corrupt("truncated block header"))?;
        let block = BlockHeader::parse([bytes[0], bytes[1], bytes[2]])?;
        pos += BLOCK_HEADER_SIZE + block.payload_len();
        if pos > data.len() {
            return Err(CodecError::corrupt("truncated block payload"));
        }
        if block.last {
            break;
        }
    }
    if info.has_checksum {
        pos += CHECKSUM_SIZE;
        if pos > data.len() {
            return Err(CodecError::corrupt("truncated checksum"));
        }
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_frame() -> Vec<u8> {
        let mut out = Vec::new();
        FrameHeader {
            has_checksum: true,
            dictionary_id: Some(0x8000_0001),
            content_size: Some(5),
            window_log: 10,
        }
        .write(&mut out);
        out.extend_from_slice(
            &BlockHeader {
                last: false,
                kind: BlockKind::Raw,
                size: 2,
            }
            .to_bytes(),
        );
        out.extend_from_slice(b"ab");
        out.extend_from_slice(
            &BlockHeader {
                last: true,
                kind: BlockKind::Rle,
                size: 3,
            }
            .to_bytes(),
        );
        out.push(b'c');
        out.extend_from_slice(&crate::checksum::checksum(b"abccc").to_le_bytes());
        out
    }

    #[test]
    fn test_frame_info() {
        let frame = tiny_frame();
        let info = get_frame_info(&frame).unwrap();
        assert_eq!(info.content_size, Some(5));
        assert_eq!(info.dictionary_id, Some(0x8000_0001));
        assert!(info.has_checksum);
        assert_eq!(info.window_size, 1024);
        assert_eq!(info.header_size, 11);
    }

    #[test]
    fn test_frame_size_ignores_trailing_data() {
        let mut frame = tiny_frame();
        let len = frame.len();
        frame.extend_from_slice(b"trailing garbage");
        assert_eq!(get_frame_size(&frame).unwrap(), len);
    }

    #[test]
    fn test_frame_size_truncated() {
        let frame = tiny_frame();
        for cut in [3, 12, frame.len() - 1] {
            assert!(matches!(
                get_frame_size(&frame[..cut]),
                Err(CodecError::CorruptStream(_))
            ));
        }
    }
}
