//! Decompressor engine
//!
//! A [`Decompressor`] accepts compressed bytes in arbitrary pieces and
//! returns content as soon as whole blocks are available. It walks the
//! frame grammar
//!
//! ```text
//! AwaitingFrameHeader -> AwaitingBlockHeader -> ReadingBlockPayload
//!     -> (AwaitingBlockHeader ...) -> AwaitingChecksum -> Done
//! ```
//!
//! and never consumes bytes beyond the end of a frame before that frame is
//! done. Concatenated frames decode back to back unless single-frame mode
//! is requested, in which case anything after the first frame is left in
//! [`Decompressor::unused_data`].

mod decoder;
mod reader;
mod state;

pub use reader::DecompressReader;

use crate::common::{BLOCK_HEADER_SIZE, CHECKSUM_SIZE};
use crate::dictionary::Dictionary;
use crate::frame::{BlockHeader, BlockKind, FrameHeader};
use crate::params::DecompressionParams;
use crate::{CodecError, CompressionStats, Result};
use state::{FrameProgress, FrameState};
use std::sync::Arc;

/// Streaming decompression session
#[derive(Debug)]
pub struct Decompressor {
    params: DecompressionParams,
    dictionary: Option<Arc<Dictionary>>,
    /// Buffered input; bytes before `input_pos` are consumed
    input: Vec<u8>,
    input_pos: usize,
    state: FrameState,
    frame: Option<FrameProgress>,
    frames_completed: u64,
    eof: bool,
    failed: bool,
    stats: CompressionStats,
}

impl Decompressor {
    /// Create a session
    pub fn new(params: &DecompressionParams) -> Self {
        Self {
            params: *params,
            dictionary: None,
            input: Vec::new(),
            input_pos: 0,
            state: FrameState::AwaitingFrameHeader,
            frame: None,
            frames_completed: 0,
            eof: false,
            failed: false,
            stats: CompressionStats::default(),
        }
    }

    /// Create a session able to decode frames made with `dictionary`
    pub fn with_dictionary(params: &DecompressionParams, dictionary: Arc<Dictionary>) -> Self {
        let mut decompressor = Self::new(params);
        decompressor.dictionary = Some(dictionary);
        decompressor
    }

    /// Feed compressed bytes and return the content they complete
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.decompress_into(data, &mut out)?;
        Ok(out)
    }

    /// Like [`push`](Self::push), appending content to `out`
    ///
    /// Content appended before an error stays in `out` and is valid.
    pub fn decompress_into(&mut self, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
        if self.failed {
            return Err(CodecError::corrupt("session failed on an earlier error"));
        }
        if self.eof {
            if data.is_empty() {
                return Ok(());
            }
            return Err(CodecError::EndOfFrame);
        }
        self.stats.input_bytes += data.len() as u64;
        self.input.extend_from_slice(data);

        let before = out.len();
        let result = self.advance(out);
        self.input.drain(..self.input_pos);
        self.input_pos = 0;
        self.stats.output_bytes += (out.len() - before) as u64;

        if let Err(err) = &result {
            log::debug!("decompression failed: {err}");
            self.failed = true;
        }
        result
    }

    /// True while a frame (or a partial frame header) is incomplete
    pub fn needs_more_input(&self) -> bool {
        !self.eof
            && (self.state != FrameState::AwaitingFrameHeader || self.input.len() > self.input_pos)
    }

    /// True when every frame seen so far is complete and nothing is buffered
    pub fn at_frame_boundary(&self) -> bool {
        self.eof || (self.state == FrameState::AwaitingFrameHeader && self.input.len() == self.input_pos)
    }

    /// True once the frame is done in single-frame mode
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Bytes received after the end of the frame in single-frame mode
    pub fn unused_data(&self) -> &[u8] {
        if self.eof {
            &self.input[self.input_pos..]
        } else {
            &[]
        }
    }

    /// Number of frames fully decoded
    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    /// Counters over everything decoded by this session
    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    /// Signal the end of input; fails if a frame was left incomplete
    pub fn finish(&mut self) -> Result<()> {
        if self.failed {
            return Err(CodecError::corrupt("session failed on an earlier error"));
        }
        if self.needs_more_input() {
            self.failed = true;
            return Err(CodecError::corrupt(format!(
                "input ended inside a frame ({:?})",
                self.state
            )));
        }
        Ok(())
    }

    /// Forget all state and start over, keeping parameters and dictionary
    pub fn reset(&mut self) {
        self.input.clear();
        self.input_pos = 0;
        self.state = FrameState::AwaitingFrameHeader;
        self.frame = None;
        self.frames_completed = 0;
        self.eof = false;
        self.failed = false;
        self.stats = CompressionStats::default();
    }

    fn pending(&self) -> &[u8] {
        &self.input[self.input_pos..]
    }

    fn frame_mut(&mut self) -> Result<&mut FrameProgress> {
        self.frame
            .as_mut()
            .ok_or_else(|| CodecError::corrupt("block outside of a frame"))
    }

    /// Run the state machine until it needs more input
    fn advance(&mut self, out: &mut Vec<u8>) -> Result<()> {
        loop {
            match self.state {
                FrameState::AwaitingFrameHeader => {
                    if self.pending().is_empty() {
                        return Ok(());
                    }
                    let Some((header, len)) = FrameHeader::parse(self.pending())? else {
                        return Ok(());
                    };
                    self.input_pos += len;
                    self.begin_frame(header)?;
                    self.state = FrameState::AwaitingBlockHeader;
                }
                FrameState::AwaitingBlockHeader => {
                    let Some(bytes) = self.pending().get(..BLOCK_HEADER_SIZE) else {
                        return Ok(());
                    };
                    let header = BlockHeader::parse([bytes[0], bytes[1], bytes[2]])?;
                    self.input_pos += BLOCK_HEADER_SIZE;
                    self.state = FrameState::ReadingBlockPayload(header);
                }
                FrameState::ReadingBlockPayload(header) => {
                    let len = header.payload_len();
                    if self.pending().len() < len {
                        return Ok(());
                    }
                    let start = self.input_pos;
                    self.input_pos += len;
                    self.decode_block(header, start, out)?;
                    self.state = if header.last {
                        FrameState::AwaitingChecksum
                    } else {
                        FrameState::AwaitingBlockHeader
                    };
                }
                FrameState::AwaitingChecksum => {
                    let expects_checksum = self.frame_mut()?.header.has_checksum;
                    if expects_checksum {
                        let Some(bytes) = self.pending().get(..CHECKSUM_SIZE) else {
                            return Ok(());
                        };
                        let expected = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                        self.input_pos += CHECKSUM_SIZE;
                        let actual = self.frame_mut()?.checksum.value();
                        if expected != actual {
                            log::warn!(
                                "frame checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
                            );
                            return Err(CodecError::ChecksumMismatch { expected, actual });
                        }
                    }
                    self.end_frame()?;
                    self.state = FrameState::Done;
                }
                FrameState::Done => {
                    if self.params.is_single_frame() {
                        self.eof = true;
                        return Ok(());
                    }
                    self.state = FrameState::AwaitingFrameHeader;
                }
            }
        }
    }

    fn begin_frame(&mut self, header: FrameHeader) -> Result<()> {
        if header.window_log as u32 > self.params.window_log_max() {
            return Err(CodecError::corrupt(format!(
                "frame window log {} exceeds the limit of {}",
                header.window_log,
                self.params.window_log_max()
            )));
        }
        match (header.dictionary_id, self.dictionary.as_deref()) {
            (Some(id), None) => return Err(CodecError::DictionaryRequired(id)),
            (Some(id), Some(dict)) if dict.id() != id => {
                return Err(CodecError::DictionaryMismatch {
                    expected: id,
                    actual: dict.id(),
                })
            }
            _ => {}
        }
        log::debug!(
            "frame: window {} bytes, content size {:?}, dictionary {:?}, checksum {}",
            header.window_size(),
            header.content_size,
            header.dictionary_id,
            header.has_checksum
        );
        let content = self.dictionary.as_deref().map(|d| d.content());
        self.frame = Some(FrameProgress::new(header, content));
        Ok(())
    }

    /// Decode the block whose payload starts at `input[start]`
    fn decode_block(&mut self, header: BlockHeader, start: usize, out: &mut Vec<u8>) -> Result<()> {
        let payload = &self.input[start..start + header.payload_len()];
        let tables = self.dictionary.as_deref().and_then(|d| d.tables());
        let Some(frame) = self.frame.as_mut() else {
            return Err(CodecError::corrupt("block outside of a frame"));
        };

        let begin = frame.history.len();
        match header.kind {
            BlockKind::Raw => frame.history.extend_from_slice(payload),
            BlockKind::Rle => {
                let byte = payload[0];
                frame.history.resize(begin + header.size as usize, byte);
            }
            BlockKind::Compressed => {
                let counts = decoder::decode_compressed_block(
                    payload,
                    &mut frame.history,
                    frame.window_size,
                    &mut frame.rep,
                    tables,
                )?;
                self.stats.literal_count += counts.literals;
                self.stats.match_count += counts.sequences;
                self.stats.longest_match = self.stats.longest_match.max(counts.longest_match);
            }
        }
        match header.kind {
            BlockKind::Raw => self.stats.raw_blocks += 1,
            BlockKind::Rle => self.stats.rle_blocks += 1,
            BlockKind::Compressed => self.stats.compressed_blocks += 1,
        }

        let content = &frame.history[begin..];
        frame.produced += content.len() as u64;
        if let Some(size) = frame.header.content_size {
            if frame.produced > size {
                return Err(CodecError::corrupt(format!(
                    "frame content exceeds its declared size of {size} bytes"
                )));
            }
        }
        frame.checksum.update(content);
        out.extend_from_slice(content);
        log::trace!("block: {:?} -> {} bytes", header.kind, content.len());
        frame.slide();
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let frame = self.frame_mut()?;
        if let Some(size) = frame.header.content_size {
            if frame.produced != size {
                return Err(CodecError::corrupt(format!(
                    "frame produced {} bytes, header declares {size}",
                    frame.produced
                )));
            }
        }
        let produced = frame.produced;
        self.frame = None;
        self.frames_completed += 1;
        log::debug!("frame complete: {produced} bytes");
        Ok(())
    }
}

/// Decompress every frame in `data`
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_all(Decompressor::new(&DecompressionParams::default()), data)
}

/// Decompress every frame in `data` using `dictionary`
pub fn decompress_with_dictionary(data: &[u8], dictionary: Arc<Dictionary>) -> Result<Vec<u8>> {
    decompress_all(
        Decompressor::with_dictionary(&DecompressionParams::default(), dictionary),
        data,
    )
}

fn decompress_all(mut decompressor: Decompressor, data: &[u8]) -> Result<Vec<u8>> {
    let out = decompressor.push(data)?;
    decompressor.finish()?;
    if decompressor.frames_completed() == 0 {
        return Err(CodecError::corrupt("no frame found in input"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::{compress, Compressor};
    use crate::params::CompressionParams;

    fn text(len: usize) -> Vec<u8> {
        b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
            .iter()
            .cycle()
            .take(len)
            .copied()
            .collect()
    }

    #[test]
    fn test_one_shot_round_trip() {
        let data = text(300_000);
        let frame = compress(&data, &CompressionParams::default()).unwrap();
        assert_eq!(decompress(&frame).unwrap(), data);
    }

    #[test]
    fn test_byte_by_byte_push() {
        let data = text(10_000);
        let frame = compress(&data, &CompressionParams::default()).unwrap();
        let mut decompressor = Decompressor::new(&DecompressionParams::default());
        let mut out = Vec::new();
        for byte in &frame {
            out.extend(decompressor.push(std::slice::from_ref(byte)).unwrap());
        }
        assert!(decompressor.at_frame_boundary());
        assert!(!decompressor.needs_more_input());
        decompressor.finish().unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_flushed_blocks_decode_early() {
        let mut compressor = Compressor::with_level(3).unwrap();
        let first = compressor.compress_chunk(b"first part ", crate::EndDirective::Flush).unwrap();
        let mut decompressor = Decompressor::new(&DecompressionParams::default());
        assert_eq!(decompressor.push(&first).unwrap(), b"first part ");
        assert!(decompressor.needs_more_input());
        let rest = compressor.compress_chunk(b"second part", crate::EndDirective::End).unwrap();
        assert_eq!(decompressor.push(&rest).unwrap(), b"second part");
        assert!(decompressor.at_frame_boundary());
    }

    #[test]
    fn test_single_frame_mode_keeps_trailing_data() {
        let frame = compress(b"payload", &CompressionParams::default()).unwrap();
        let mut input = frame.clone();
        input.extend_from_slice(b"trailer");
        let params = DecompressionParams::default().single_frame(true);
        let mut decompressor = Decompressor::new(&params);
        assert_eq!(decompressor.push(&input).unwrap(), b"payload");
        assert!(decompressor.eof());
        assert_eq!(decompressor.unused_data(), b"trailer");
        assert!(matches!(decompressor.push(b"more"), Err(CodecError::EndOfFrame)));
    }

    #[test]
    fn test_truncated_frame() {
        let frame = compress(&text(5000), &CompressionParams::default()).unwrap();
        let cut = &frame[..frame.len() - 2];
        assert!(matches!(decompress(cut), Err(CodecError::CorruptStream(_))));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut frame = compress(&text(5000), &CompressionParams::default()).unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;
        assert!(matches!(decompress(&frame), Err(CodecError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_failed_session_stays_failed() {
        let mut decompressor = Decompressor::new(&DecompressionParams::default());
        assert!(decompressor.push(b"not a frame").is_err());
        assert!(matches!(decompressor.push(b""), Err(CodecError::CorruptStream(_))));
        decompressor.reset();
        assert!(decompressor.push(b"").is_ok());
    }

    #[test]
    fn test_window_limit() {
        let params = CompressionParams::default().with_window_log(20).unwrap();
        let mut compressor = Compressor::new(&params).unwrap();
        let frame = compressor.compress_chunk(&text(1000), crate::EndDirective::End).unwrap();
        let limited = DecompressionParams::default().with_window_log_max(18).unwrap();
        let mut decompressor = Decompressor::new(&limited);
        assert!(matches!(decompressor.push(&frame), Err(CodecError::CorruptStream(_))));
    }

    #[test]
    fn test_empty_input_has_no_frame() {
        assert!(decompress(b"").is_err());
    }

    #[test]
    fn test_missing_dictionary() {
        let dict = Arc::new(Dictionary::from_content(text(2000)).unwrap());
        let frame =
            crate::compress::compress_with_dictionary(&text(300), &CompressionParams::default(), dict.clone())
                .unwrap();
        assert!(matches!(decompress(&frame), Err(CodecError::DictionaryRequired(id)) if id == dict.id()));
        assert_eq!(decompress_with_dictionary(&frame, dict).unwrap(), text(300));
    }
}
