//! zcodec - streaming LZ77 + Huffman compression in pure Rust
//!
//! This crate implements a general-purpose lossless codec with a framed wire
//! format. Input is split into blocks; each block is parsed into literals and
//! back-references by a level-dependent match finder, then entropy coded
//! with canonical Huffman codes.
//!
//! # Features
//!
//! - Levels 1 to 22, from a greedy hash-table parser to an optimal parser
//! - Streaming sessions: `push` / `flush` / `finish` with bounded memory
//! - Self-describing frames with optional content size and checksum
//! - Concatenated frames decode back to back
//! - Dictionaries, including a trainer that builds them from samples
//! - Long-distance matching for large windows
//! - `Read`/`Write` adapters, a seekable file wrapper and async adapters
//!
//! # Example - One-shot
//!
//! ```
//! use zcodec::{compress, decompress, CompressionParams};
//!
//! let data = b"Hello, World! Hello, World! Hello, World!";
//! let frame = compress(data, &CompressionParams::from_level(3)?)?;
//! assert_eq!(decompress(&frame)?, data);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Example - Streaming
//!
//! ```
//! use zcodec::{CompressWriter, DecompressReader};
//! use std::io::{Read, Write};
//!
//! let mut writer = CompressWriter::with_level(Vec::new(), 5)?;
//! writer.write_all(b"streamed content, ")?;
//! writer.write_all(b"streamed content")?;
//! let frame = writer.finish()?;
//!
//! let mut reader = DecompressReader::new(&frame[..]);
//! let mut out = String::new();
//! reader.read_to_string(&mut out)?;
//! assert_eq!(out, "streamed content, streamed content");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Public modules
pub mod bitio;
pub mod checksum;
pub mod common;
pub mod compress;
pub mod decompress;
pub mod dictionary;
pub mod entropy;
pub mod error;
pub mod file;
pub mod frame;
pub mod params;

// Async modules (only available with async feature)
#[cfg(feature = "async")]
pub mod async_batch;
#[cfg(feature = "async")]
pub mod async_compress;
#[cfg(feature = "async")]
pub mod async_convenience;
#[cfg(feature = "async")]
pub mod async_decompress;

// Re-export commonly used types
pub use common::{compress_bound, CompressionStats};
pub use compress::{compress, compress_with_dictionary, CompressWriter, Compressor};
pub use decompress::{decompress, decompress_with_dictionary, DecompressReader, Decompressor};
pub use dictionary::{train_dictionary, train_dictionary_for_level, Dictionary, EntropyTables};
pub use error::{CodecError, ErrorKind, Result};
pub use file::{FileMode, FileOptions, ZFile};
pub use frame::{get_frame_info, get_frame_size, FrameInfo};
pub use params::{
    compress_level_bounds, CompressParameter, CompressionParams, DecompressParameter,
    DecompressionParams, EndDirective, Strategy,
};

// Re-export async types when async feature is enabled
#[cfg(feature = "async")]
pub use async_batch::AsyncBatchProcessor;
#[cfg(feature = "async")]
pub use async_compress::AsyncCompressWriter;
#[cfg(feature = "async")]
pub use async_convenience::*;
#[cfg(feature = "async")]
pub use async_decompress::AsyncDecompressReader;

/// Library version string
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
