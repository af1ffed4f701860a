//! Compressor engine
//!
//! A [`Compressor`] turns pushed bytes into one frame. Input is buffered
//! until a full block is available; each block is parsed into sequences by
//! the configured strategy, entropy coded, and emitted as the smallest of
//! the compressed, raw and run-length forms.

mod hash;
mod ldm;
mod optimal;
mod pattern;
mod sequences;
mod state;
mod writer;

pub use writer::CompressWriter;

pub(crate) use sequences::{SymbolStats, LITERALS_HUFFMAN, LITERALS_RAW, LITERALS_RLE};

use crate::checksum::ContentChecksum;
use crate::dictionary::Dictionary;
use crate::frame::{BlockHeader, BlockKind, FrameHeader};
use crate::params::{CompressionParams, EndDirective, ResolvedParams};
use crate::{CodecError, CompressionStats, Result};
use sequences::{encode_payload, SymbolStream};
use state::MatchState;
use std::sync::Arc;

/// Streaming compression session producing one frame at a time
#[derive(Debug)]
pub struct Compressor {
    params: ResolvedParams,
    dictionary: Option<Arc<Dictionary>>,
    pledged_size: Option<u64>,
    matcher: Option<MatchState>,
    pending: Vec<u8>,
    stream: SymbolStream,
    checksum: ContentChecksum,
    consumed: u64,
    /// Repeat offset as the decoder will see it
    rep: u32,
    closed: bool,
    stats: CompressionStats,
}

impl Compressor {
    /// Create a session, validating every parameter
    pub fn new(params: &CompressionParams) -> Result<Self> {
        let params = params.resolve()?;
        log::debug!(
            "compressor: level {} strategy {:?} window_log {}",
            params.level,
            params.strategy,
            params.window_log
        );
        Ok(Self {
            params,
            dictionary: None,
            pledged_size: None,
            matcher: None,
            pending: Vec::new(),
            stream: SymbolStream::default(),
            checksum: ContentChecksum::new(),
            consumed: 0,
            rep: 1,
            closed: false,
            stats: CompressionStats::default(),
        })
    }

    /// Create a session primed with `dictionary`
    pub fn with_dictionary(params: &CompressionParams, dictionary: Arc<Dictionary>) -> Result<Self> {
        let mut compressor = Self::new(params)?;
        log::debug!(
            "compressor: dictionary {:#010x} ({} bytes)",
            dictionary.id(),
            dictionary.content().len()
        );
        compressor.dictionary = Some(dictionary);
        Ok(compressor)
    }

    /// Create a session from a level preset
    pub fn with_level(level: i32) -> Result<Self> {
        Self::new(&CompressionParams::from_level(level)?)
    }

    /// Announce the exact content size of the frame
    ///
    /// Must be called before any input is pushed. The size is written into
    /// the frame header (unless disabled) and lets the window shrink to fit.
    pub fn set_pledged_size(&mut self, size: u64) -> Result<()> {
        if self.closed {
            return Err(CodecError::SessionClosed);
        }
        if self.matcher.is_some() || self.consumed > 0 {
            return Err(CodecError::config(
                "pledged size must be set before the frame starts",
            ));
        }
        self.pledged_size = Some(size);
        Ok(())
    }

    /// Feed input; returns whatever compressed output is ready
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        if self.closed {
            return Err(CodecError::SessionClosed);
        }
        if let Some(pledged) = self.pledged_size {
            let total = self.consumed + data.len() as u64;
            if total > pledged {
                return Err(CodecError::SizeMismatch {
                    expected: pledged,
                    actual: total,
                });
            }
        }
        self.checksum.update(data);
        self.consumed += data.len() as u64;
        self.stats.input_bytes += data.len() as u64;
        self.pending.extend_from_slice(data);

        let mut out = Vec::new();
        let block_size = self.block_size();
        if self.pending.len() > block_size {
            self.start_frame(&mut out)?;
            while self.pending.len() > block_size {
                self.emit_block(block_size, false, &mut out)?;
            }
        }
        self.stats.output_bytes += out.len() as u64;
        Ok(out)
    }

    /// Emit everything buffered so far without closing the frame
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(CodecError::SessionClosed);
        }
        let mut out = Vec::new();
        self.start_frame(&mut out)?;
        let block_size = self.block_size();
        while !self.pending.is_empty() {
            let len = self.pending.len().min(block_size);
            self.emit_block(len, false, &mut out)?;
        }
        self.stats.output_bytes += out.len() as u64;
        Ok(out)
    }

    /// Close the frame: emit remaining input, the last block and the checksum
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        if self.closed {
            return Err(CodecError::SessionClosed);
        }
        if let Some(pledged) = self.pledged_size {
            if pledged != self.consumed {
                return Err(CodecError::SizeMismatch {
                    expected: pledged,
                    actual: self.consumed,
                });
            }
        }

        let mut out = Vec::new();
        self.start_frame(&mut out)?;
        let block_size = self.block_size();
        loop {
            let len = self.pending.len().min(block_size);
            let last = len == self.pending.len();
            self.emit_block(len, last, &mut out)?;
            if last {
                break;
            }
        }
        if self.params.checksum_flag {
            out.extend_from_slice(&self.checksum.value().to_le_bytes());
        }
        self.closed = true;
        self.matcher = None;
        self.stats.output_bytes += out.len() as u64;
        log::debug!(
            "frame finished: {} bytes in, {} bytes out",
            self.stats.input_bytes,
            self.stats.output_bytes
        );
        Ok(out)
    }

    /// Push `data`, then flush or finish as `directive` asks
    pub fn compress_chunk(&mut self, data: &[u8], directive: EndDirective) -> Result<Vec<u8>> {
        let mut out = self.push(data)?;
        match directive {
            EndDirective::Continue => {}
            EndDirective::Flush => out.extend(self.flush()?),
            EndDirective::End => out.extend(self.finish()?),
        }
        Ok(out)
    }

    /// Start a new frame with the same parameters and dictionary
    pub fn reset(&mut self) {
        self.pledged_size = None;
        self.matcher = None;
        self.pending.clear();
        self.checksum = ContentChecksum::new();
        self.consumed = 0;
        self.rep = 1;
        self.closed = false;
        self.stats = CompressionStats::default();
    }

    /// Statistics of the current frame
    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    /// True once [`finish`](Self::finish) has closed the frame
    pub fn is_finished(&self) -> bool {
        self.closed
    }

    fn block_size(&self) -> usize {
        self.matcher
            .as_ref()
            .map_or(self.params.block_size(), |m| m.params.block_size())
    }

    /// Write the frame header and build the match state, once per frame
    fn start_frame(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.matcher.is_some() {
            return Ok(());
        }
        let mut params = self.params.clone();
        let dictionary = self.dictionary.as_deref();
        if let Some(size) = self.pledged_size {
            params.adjust_for_source(size, dictionary.map_or(0, |d| d.content().len()));
        }

        let header = FrameHeader {
            has_checksum: params.checksum_flag,
            dictionary_id: dictionary.filter(|_| params.dict_id_flag).map(|d| d.id()),
            content_size: self.pledged_size.filter(|_| params.content_size_flag),
            window_log: params.window_log as u8,
        };
        header.write(out);
        log::trace!("frame header: {header:?}");

        self.matcher = Some(MatchState::new(params, dictionary.map(|d| d.content())));
        Ok(())
    }

    /// Compress the first `len` pending bytes into one block
    fn emit_block(&mut self, len: usize, last: bool, out: &mut Vec<u8>) -> Result<()> {
        let Some(matcher) = self.matcher.as_mut() else {
            return Err(CodecError::config("block emitted before the frame header"));
        };
        let (start, end) = matcher.append(&self.pending[..len]);
        self.pending.drain(..len);
        let content = &matcher.window[start..end];

        let (kind, payload) = if content.is_empty() {
            (BlockKind::Raw, Vec::new())
        } else if content.iter().all(|&b| b == content[0]) {
            (BlockKind::Rle, vec![content[0]])
        } else {
            self.stream.clear();
            let mut rep = self.rep;
            if let Some(ldm) = matcher.ldm.as_mut() {
                ldm.scan(&matcher.window, matcher.base, start, end);
            }
            let strategy = matcher.params.strategy;
            if strategy.is_optimal() {
                matcher.parse_optimal(start, end, &mut rep, &mut self.stream);
            } else {
                matcher.parse_lazy(start, end, &mut rep, strategy.lazy_depth(), &mut self.stream);
            }

            let tables = self.dictionary.as_deref().and_then(|d| d.tables());
            let mut wire_rep = self.rep;
            let compressed = encode_payload(len, &self.stream, &mut wire_rep, tables)?;
            if compressed.len() < len {
                self.rep = wire_rep;
                self.stats.literal_count += self.stream.literals.len();
                self.stats.match_count += self.stream.sequences.len();
                if let Some(longest) = self.stream.sequences.iter().map(|s| s.match_length).max() {
                    self.stats.longest_match = self.stats.longest_match.max(longest as usize);
                }
                (BlockKind::Compressed, compressed)
            } else {
                (BlockKind::Raw, matcher.window[start..end].to_vec())
            }
        };

        let size = match kind {
            BlockKind::Rle => len,
            _ => payload.len(),
        };
        let header = BlockHeader {
            last,
            kind,
            size: size as u32,
        };
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&payload);
        match kind {
            BlockKind::Raw => self.stats.raw_blocks += 1,
            BlockKind::Rle => self.stats.rle_blocks += 1,
            BlockKind::Compressed => self.stats.compressed_blocks += 1,
        }
        log::trace!("block: {kind:?} {len} -> {} bytes, last={last}", payload.len());

        matcher.slide();
        Ok(())
    }
}

/// Compress `data` into a single frame
pub fn compress(data: &[u8], params: &CompressionParams) -> Result<Vec<u8>> {
    compress_frame(Compressor::new(params)?, data)
}

/// Compress `data` into a single frame primed with `dictionary`
pub fn compress_with_dictionary(
    data: &[u8],
    params: &CompressionParams,
    dictionary: Arc<Dictionary>,
) -> Result<Vec<u8>> {
    compress_frame(Compressor::with_dictionary(params, dictionary)?, data)
}

fn compress_frame(mut compressor: Compressor, data: &[u8]) -> Result<Vec<u8>> {
    compressor.set_pledged_size(data.len() as u64)?;
    compressor.compress_chunk(data, EndDirective::End)
}

/// Aggregate symbol statistics of compressing each sample with `history`
/// as its dictionary content
pub(crate) fn sample_statistics(history: &[u8], samples: &[&[u8]], level: i32) -> Result<SymbolStats> {
    let base = CompressionParams::from_level(level)?.resolve()?;
    let mut stats = SymbolStats::default();
    let mut stream = SymbolStream::default();
    for sample in samples {
        let mut params = base.clone();
        params.adjust_for_source(sample.len() as u64, history.len());
        let block_size = params.block_size();
        let strategy = params.strategy;
        let mut matcher = MatchState::new(params, Some(history));
        let mut rep = 1;
        let mut counted_rep = 1;
        for block in sample.chunks(block_size) {
            let (start, end) = matcher.append(block);
            stream.clear();
            if let Some(ldm) = matcher.ldm.as_mut() {
                ldm.scan(&matcher.window, matcher.base, start, end);
            }
            if strategy.is_optimal() {
                matcher.parse_optimal(start, end, &mut rep, &mut stream);
            } else {
                matcher.parse_lazy(start, end, &mut rep, strategy.lazy_depth(), &mut stream);
            }
            stats.add(&stream, &mut counted_rep);
            matcher.slide();
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::get_frame_info;

    fn sample_text(len: usize) -> Vec<u8> {
        b"It was the best of times, it was the worst of times, it was the age of wisdom. "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    #[test]
    fn test_empty_frame() {
        let frame = compress(b"", &CompressionParams::default()).unwrap();
        let info = get_frame_info(&frame).unwrap();
        assert_eq!(info.content_size, Some(0));
        assert!(info.has_checksum);
    }

    #[test]
    fn test_compresses_repetitive_text() {
        let data = sample_text(100_000);
        let frame = compress(&data, &CompressionParams::default()).unwrap();
        assert!(frame.len() < data.len() / 20);
    }

    #[test]
    fn test_push_buffers_until_block_is_full() {
        let mut compressor = Compressor::with_level(1).unwrap();
        assert!(compressor.push(b"small").unwrap().is_empty());
        let flushed = compressor.flush().unwrap();
        assert!(!flushed.is_empty());
        let tail = compressor.finish().unwrap();
        assert!(!tail.is_empty());
        assert_eq!(compressor.stats().input_bytes, 5);
    }

    #[test]
    fn test_session_closed_after_finish() {
        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.finish().unwrap();
        assert!(matches!(compressor.push(b"x"), Err(CodecError::SessionClosed)));
        assert!(matches!(compressor.flush(), Err(CodecError::SessionClosed)));
        compressor.reset();
        assert!(compressor.push(b"x").is_ok());
    }

    #[test]
    fn test_pledged_size_enforced() {
        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.set_pledged_size(4).unwrap();
        assert!(matches!(
            compressor.push(b"too long"),
            Err(CodecError::SizeMismatch { expected: 4, .. })
        ));

        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.set_pledged_size(10).unwrap();
        compressor.push(b"short").unwrap();
        assert!(matches!(compressor.finish(), Err(CodecError::SizeMismatch { .. })));
    }

    #[test]
    fn test_pledged_size_after_start_rejected() {
        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.push(b"data").unwrap();
        assert!(matches!(
            compressor.set_pledged_size(4),
            Err(CodecError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_block_kinds() {
        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.compress_chunk(&[0u8; 5000], EndDirective::End).unwrap();
        assert_eq!(compressor.stats().rle_blocks, 1);

        let mut seed = 0x2545_F491_4F6C_DD1Du64;
        let noise: Vec<u8> = (0..5000)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed >> 32) as u8
            })
            .collect();
        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.compress_chunk(&noise, EndDirective::End).unwrap();
        assert_eq!(compressor.stats().raw_blocks, 1);

        let mut compressor = Compressor::with_level(3).unwrap();
        compressor.compress_chunk(&sample_text(5000), EndDirective::End).unwrap();
        assert_eq!(compressor.stats().compressed_blocks, 1);
        assert!(compressor.stats().match_count > 0);
    }

    #[test]
    fn test_window_shrinks_to_pledged_size() {
        let frame = compress(b"tiny input", &CompressionParams::from_level(19).unwrap()).unwrap();
        assert_eq!(get_frame_info(&frame).unwrap().window_size, 1024);
    }

    #[test]
    fn test_sample_statistics() {
        let history = sample_text(2000);
        let sample = sample_text(500);
        let stats = sample_statistics(&history, &[&sample], 3).unwrap();
        assert!(stats.offsets.iter().sum::<u32>() > 0);
    }
}
