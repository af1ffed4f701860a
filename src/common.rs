//! Common types and constants for the zcodec format
//!
//! This module defines the error type, the wire-format constants and the
//! statistics structures shared by the compressor, the decompressor and the
//! dictionary trainer.

use thiserror::Error;

/// Frame magic number, stored little-endian ("ZCF1")
pub const FRAME_MAGIC: u32 = 0x3146_435A;

/// Serialized dictionary magic number, stored little-endian ("ZCD1")
pub const DICT_MAGIC: u32 = 0x3144_435A;

/// Largest amount of content a single block may regenerate (128 KiB)
pub const BLOCK_SIZE_MAX: usize = 1 << 17;

/// Smallest target block size any parameter set can produce (1 KiB)
pub const BLOCK_SIZE_MIN: usize = 1 << 10;

/// Size of a block header in bytes
pub const BLOCK_HEADER_SIZE: usize = 3;

/// Size of the content checksum trailer in bytes
pub const CHECKSUM_SIZE: usize = 4;

/// Largest possible frame header: magic, flags, window log, dictionary id, 8-byte content size
pub const MAX_FRAME_HEADER_SIZE: usize = 4 + 1 + 1 + 4 + 8;

/// Smallest possible frame header: magic, flags, window log
pub const MIN_FRAME_HEADER_SIZE: usize = 4 + 1 + 1;

/// Fixed per-frame overhead on top of the per-block headers
pub const FRAME_OVERHEAD: usize = MAX_FRAME_HEADER_SIZE + CHECKSUM_SIZE;

/// Smallest match the format can express
pub const MIN_MATCH_FLOOR: usize = 3;

/// Longest code length used by the entropy coder
pub const MAX_CODE_BITS: u8 = 11;

/// Error type for codec operations
#[derive(Debug, Error)]
pub enum CodecError {
    /// Conflicting or otherwise invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A numeric parameter outside its declared bounds
    #[error("Parameter {parameter} = {value} out of bounds [{min}, {max}]")]
    ParameterOutOfBounds {
        /// Parameter name
        parameter: &'static str,
        /// Rejected value
        value: i64,
        /// Inclusive lower bound
        min: i32,
        /// Inclusive upper bound
        max: i32,
    },

    /// Malformed header, truncated block or invalid entropy code
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// Content checksum in the frame trailer does not match the content
    #[error("Checksum mismatch: expected {expected:08X}, got {actual:08X}")]
    ChecksumMismatch {
        /// Checksum stored in the frame
        expected: u32,
        /// Checksum of the decoded content
        actual: u32,
    },

    /// Frame references a dictionary but none was supplied
    #[error("Dictionary {0:#010x} required to decode this frame")]
    DictionaryRequired(u32),

    /// Frame references a different dictionary than the one supplied
    #[error("Dictionary mismatch: frame expects {expected:#010x}, got {actual:#010x}")]
    DictionaryMismatch {
        /// Dictionary id recorded in the frame
        expected: u32,
        /// Id of the supplied dictionary
        actual: u32,
    },

    /// Dictionary training was given no samples
    #[error("Empty input: at least one sample is required")]
    EmptyInput,

    /// Dictionary training found nothing worth keeping
    #[error("Dictionary training failed: {0}")]
    TrainingFailed(String),

    /// Session was already finished
    #[error("Session closed: the frame has been finished")]
    SessionClosed,

    /// Single-frame decompressor already reached the end of its frame
    #[error("Already at the end of the frame")]
    EndOfFrame,

    /// Pledged content size and actual content size disagree
    #[error("Content size mismatch: pledged {expected}, got {actual}")]
    SizeMismatch {
        /// Pledged size
        expected: u64,
        /// Actual size
        actual: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised at construction, never mid-stream
    Configuration,
    /// Malformed input; the session is unusable afterwards
    Corruption,
    /// Checksum failure at frame end
    Checksum,
    /// Missing or wrong dictionary
    Dictionary,
    /// Trainer input problems
    Training,
    /// Misuse of a finished session
    Usage,
    /// Underlying I/O failure
    Io,
}

impl CodecError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::ConfigurationError(_) | CodecError::ParameterOutOfBounds { .. } => {
                ErrorKind::Configuration
            }
            CodecError::CorruptStream(_) => ErrorKind::Corruption,
            CodecError::ChecksumMismatch { .. } => ErrorKind::Checksum,
            CodecError::DictionaryRequired(_) | CodecError::DictionaryMismatch { .. } => {
                ErrorKind::Dictionary
            }
            CodecError::EmptyInput | CodecError::TrainingFailed(_) => ErrorKind::Training,
            CodecError::SessionClosed
            | CodecError::EndOfFrame
            | CodecError::SizeMismatch { .. } => ErrorKind::Usage,
            CodecError::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for a `CorruptStream` error
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        CodecError::CorruptStream(msg.into())
    }

    /// Shorthand for a `ConfigurationError`
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        CodecError::ConfigurationError(msg.into())
    }
}

impl From<CodecError> for std::io::Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Worst-case compressed size of `src_len` bytes in a single frame
///
/// Every block costs at most its content plus a header, and the frame adds a
/// header and a checksum. Blocks are counted at the smallest block size so the
/// bound holds for any level or window override.
pub fn compress_bound(src_len: usize) -> usize {
    let blocks = src_len.div_ceil(BLOCK_SIZE_MIN).max(1);
    src_len + FRAME_OVERHEAD + blocks * BLOCK_HEADER_SIZE
}

/// Statistics for compression/decompression sessions
#[derive(Debug, Default, Clone)]
pub struct CompressionStats {
    /// Number of literal bytes encoded/decoded
    pub literal_count: usize,
    /// Number of matches encoded/decoded
    pub match_count: usize,
    /// Longest match found
    pub longest_match: usize,
    /// Blocks emitted as raw
    pub raw_blocks: usize,
    /// Blocks emitted as run-length
    pub rle_blocks: usize,
    /// Blocks emitted entropy-compressed
    pub compressed_blocks: usize,
    /// Uncompressed bytes
    pub input_bytes: u64,
    /// Compressed bytes
    pub output_bytes: u64,
}

impl CompressionStats {
    /// Compressed size divided by uncompressed size
    pub fn compression_ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CodecError::config("x").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(CodecError::corrupt("x").kind(), ErrorKind::Corruption);
        assert_eq!(
            CodecError::ChecksumMismatch {
                expected: 1,
                actual: 2
            }
            .kind(),
            ErrorKind::Checksum
        );
        assert_eq!(
            CodecError::DictionaryRequired(7).kind(),
            ErrorKind::Dictionary
        );
        assert_eq!(CodecError::EmptyInput.kind(), ErrorKind::Training);
        assert_eq!(CodecError::SessionClosed.kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_io_conversion() {
        let io: std::io::Error = CodecError::corrupt("bad block").into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);

        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let io: std::io::Error = CodecError::Io(inner).into();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_compress_bound() {
        assert_eq!(compress_bound(0), FRAME_OVERHEAD + BLOCK_HEADER_SIZE);
        assert_eq!(
            compress_bound(BLOCK_SIZE_MIN + 1),
            BLOCK_SIZE_MIN + 1 + FRAME_OVERHEAD + 2 * BLOCK_HEADER_SIZE
        );
        assert_eq!(
            compress_bound(BLOCK_SIZE_MAX),
            BLOCK_SIZE_MAX + FRAME_OVERHEAD + 128 * BLOCK_HEADER_SIZE
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(FRAME_MAGIC.to_le_bytes(), *b"ZCF1");
        assert_eq!(DICT_MAGIC.to_le_bytes(), *b"ZCD1");
        assert_eq!(MAX_FRAME_HEADER_SIZE, 18);
        assert_eq!(BLOCK_SIZE_MAX, 131072);
    }
}
