//! Block headers and sequences
//!
//! A block header is a 24-bit little-endian word:
//!
//! ```text
//! bit 0      last block of the frame
//! bits 1-2   kind (0 raw, 1 rle, 2 compressed, 3 reserved)
//! bits 3-23  size (payload bytes, or the run length for rle)
//! ```

use crate::common::{BLOCK_HEADER_SIZE, BLOCK_SIZE_MAX};
use crate::{CodecError, Result};

/// How a block's content is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Content stored verbatim
    Raw = 0,
    /// One byte repeated `size` times
    Rle = 1,
    /// Literals and sequences, entropy coded
    Compressed = 2,
}

/// Decoded block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Last block of the frame
    pub last: bool,
    /// Storage kind
    pub kind: BlockKind,
    /// Payload size (raw, compressed) or run length (rle)
    pub size: u32,
}

impl BlockHeader {
    /// Serialized header
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let word = (self.last as u32) | ((self.kind as u32) << 1) | (self.size << 3);
        let bytes = word.to_le_bytes();
        [bytes[0], bytes[1], bytes[2]]
    }

    /// Parse a header, rejecting the reserved kind and oversize blocks
    pub fn parse(bytes: [u8; BLOCK_HEADER_SIZE]) -> Result<Self> {
        let word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
        let kind = match (word >> 1) & 0x03 {
            0 => BlockKind::Raw,
            1 => BlockKind::Rle,
            2 => BlockKind::Compressed,
            _ => return Err(CodecError::corrupt("reserved block kind")),
        };
        let size = word >> 3;
        if size as usize > BLOCK_SIZE_MAX {
            return Err(CodecError::corrupt(format!(
                "block size {size} exceeds {BLOCK_SIZE_MAX}"
            )));
        }
        Ok(Self {
            last: word & 1 != 0,
            kind,
            size,
        })
    }

    /// Bytes following the header in the stream
    pub fn payload_len(&self) -> usize {
        match self.kind {
            BlockKind::Rle => 1,
            BlockKind::Raw | BlockKind::Compressed => self.size as usize,
        }
    }
}

/// A run of literals followed by a back-reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    /// Literal bytes copied before the match
    pub literal_length: u32,
    /// Distance back into the history, at least 1
    pub offset: u32,
    /// Bytes copied from the history
    pub match_length: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = BlockHeader {
            last: true,
            kind: BlockKind::Compressed,
            size: 1000,
        };
        let bytes = header.to_bytes();
        assert_eq!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]), 1 | 4 | (1000 << 3));
        assert_eq!(BlockHeader::parse(bytes).unwrap(), header);
    }

    #[test]
    fn test_rle_payload_is_one_byte() {
        let header = BlockHeader {
            last: false,
            kind: BlockKind::Rle,
            size: BLOCK_SIZE_MAX as u32,
        };
        assert_eq!(header.payload_len(), 1);
        assert_eq!(BlockHeader::parse(header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn test_rejects_reserved_and_oversize() {
        assert!(BlockHeader::parse([0x06, 0, 0]).is_err());
        let oversize = ((BLOCK_SIZE_MAX as u32 + 1) << 3).to_le_bytes();
        assert!(BlockHeader::parse([oversize[0], oversize[1], oversize[2]]).is_err());
    }
}
