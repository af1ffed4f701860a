//! CompressWriter - streaming compression over any `Write`

use super::Compressor;
use crate::dictionary::Dictionary;
use crate::params::CompressionParams;
use crate::{CodecError, Result};
use std::io::Write;
use std::sync::Arc;

/// Compresses everything written to it into one frame on the inner writer
#[derive(Debug)]
pub struct CompressWriter<W: Write> {
    /// `None` only after `finish` handed the writer back
    writer: Option<W>,
    compressor: Compressor,
}

impl<W: Write> CompressWriter<W> {
    /// Create a writer with explicit parameters
    pub fn new(writer: W, params: &CompressionParams) -> Result<Self> {
        Ok(Self {
            writer: Some(writer),
            compressor: Compressor::new(params)?,
        })
    }

    /// Create a writer primed with a dictionary
    pub fn with_dictionary(writer: W, params: &CompressionParams, dictionary: Arc<Dictionary>) -> Result<Self> {
        Ok(Self {
            writer: Some(writer),
            compressor: Compressor::with_dictionary(params, dictionary)?,
        })
    }

    /// Create a writer from a level preset
    pub fn with_level(writer: W, level: i32) -> Result<Self> {
        Self::new(writer, &CompressionParams::from_level(level)?)
    }

    /// Announce the exact number of bytes that will be written
    pub fn set_pledged_size(&mut self, size: u64) -> Result<()> {
        self.compressor.set_pledged_size(size)
    }

    /// Reference to the inner writer
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    /// Session statistics so far
    pub fn stats(&self) -> &crate::CompressionStats {
        self.compressor.stats()
    }

    fn emit(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let writer = self.writer.as_mut().ok_or(CodecError::SessionClosed)?;
        writer.write_all(data)?;
        Ok(())
    }

    /// Close the frame and return the inner writer
    pub fn finish(mut self) -> Result<W> {
        let tail = self.compressor.finish()?;
        self.emit(&tail)?;
        let mut writer = self.writer.take().ok_or(CodecError::SessionClosed)?;
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let out = self.compressor.push(buf)?;
        self.emit(&out)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let out = self.compressor.flush()?;
        self.emit(&out)?;
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for CompressWriter<W> {
    fn drop(&mut self) {
        if self.writer.is_some() && !self.compressor.is_finished() {
            // Errors cannot be reported from drop
            if let Ok(tail) = self.compressor.finish() {
                let _ = self.emit(&tail);
            }
        }
    }
}
