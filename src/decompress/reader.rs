//! DecompressReader - streaming decompression over any `Read`

use super::Decompressor;
use crate::dictionary::Dictionary;
use crate::params::DecompressionParams;
use crate::Result;
use std::io::{self, Read};
use std::sync::Arc;

/// Compressed bytes pulled from the source per refill
const INPUT_CHUNK: usize = 32 * 1024;

/// Reads the decompressed content of every frame in the source, back to back
#[derive(Debug)]
pub struct DecompressReader<R: Read> {
    reader: R,
    decompressor: Decompressor,
    input_buffer: Vec<u8>,
    output_buffer: Vec<u8>,
    output_pos: usize,
    finished: bool,
}

impl<R: Read> DecompressReader<R> {
    /// Create a reader with default parameters
    pub fn new(reader: R) -> Self {
        Self::with_params(reader, &DecompressionParams::default())
    }

    /// Create a reader with explicit parameters
    pub fn with_params(reader: R, params: &DecompressionParams) -> Self {
        Self::from_decompressor(reader, Decompressor::new(params))
    }

    /// Create a reader for frames made with `dictionary`
    pub fn with_dictionary(reader: R, params: &DecompressionParams, dictionary: Arc<Dictionary>) -> Self {
        Self::from_decompressor(reader, Decompressor::with_dictionary(params, dictionary))
    }

    fn from_decompressor(reader: R, decompressor: Decompressor) -> Self {
        Self {
            reader,
            decompressor,
            input_buffer: vec![0; INPUT_CHUNK],
            output_buffer: Vec::new(),
            output_pos: 0,
            finished: false,
        }
    }

    /// Reference to the source
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Give back the source
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Pull compressed input until some content is ready or the source ends
    fn fill(&mut self) -> Result<()> {
        self.output_buffer.clear();
        self.output_pos = 0;
        while self.output_buffer.is_empty() && !self.finished {
            let n = self.reader.read(&mut self.input_buffer)?;
            if n == 0 {
                self.decompressor.finish()?;
                self.finished = true;
                break;
            }
            self.decompressor
                .decompress_into(&self.input_buffer[..n], &mut self.output_buffer)?;
            if self.decompressor.eof() {
                self.finished = true;
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.output_pos >= self.output_buffer.len() {
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }
        let available = &self.output_buffer[self.output_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.output_pos += n;
        Ok(n)
    }
}
