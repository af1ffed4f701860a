//! Streaming file wrapper
//!
//! [`ZFile`] reads or writes compressed data through ordinary `std::io`
//! traits. In read mode the source is decompressed on the fly with a
//! buffered prefetch; frames written back to back (for example by
//! successive appends) read as one continuous stream. In write mode every
//! `write` hands whatever the compressor produced straight to the sink, and
//! [`ZFile::close`] writes the frame trailer.
//!
//! Seeking in read mode is emulated and can be slow: a backward seek
//! rewinds the source and decompresses again from the start, a forward seek
//! decompresses and discards, and `SeekFrom::End` first reads to the end.

use crate::compress::Compressor;
use crate::decompress::Decompressor;
use crate::dictionary::Dictionary;
use crate::params::{CompressionParams, DecompressionParams};
use crate::{CodecError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

/// Compressed bytes read from the source per refill
pub const DEFAULT_READ_SIZE: usize = 128 * 1024;

/// How a [`ZFile`] is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// `r` / `rb`: decompress an existing file
    Read,
    /// `w` / `wb`: create or truncate
    Write,
    /// `a` / `ab`: append a new frame to the end
    Append,
    /// `x` / `xb`: create, failing if the file exists
    Exclusive,
}

impl FileMode {
    /// Parse a mode string; text modes are rejected
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "r" | "rb" => Ok(FileMode::Read),
            "w" | "wb" => Ok(FileMode::Write),
            "a" | "ab" => Ok(FileMode::Append),
            "x" | "xb" => Ok(FileMode::Exclusive),
            other => Err(CodecError::config(format!("invalid file mode {other:?}"))),
        }
    }

    /// True for the read mode
    pub fn is_read(self) -> bool {
        self == FileMode::Read
    }
}

/// Settings for a [`ZFile`]
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// Compression settings for write modes
    pub compression: CompressionParams,
    /// Decompression settings for read mode
    pub decompression: DecompressionParams,
    /// Dictionary used in either direction
    pub dictionary: Option<Arc<Dictionary>>,
    /// Bytes read from the source per refill
    pub read_size: usize,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            compression: CompressionParams::default(),
            decompression: DecompressionParams::default(),
            dictionary: None,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

impl FileOptions {
    /// Options compressing at `level`
    pub fn with_level(level: i32) -> Result<Self> {
        Ok(Self {
            compression: CompressionParams::from_level(level)?,
            ..Self::default()
        })
    }

    /// Use `dictionary` for both directions
    pub fn dictionary(mut self, dictionary: Arc<Dictionary>) -> Self {
        self.dictionary = Some(dictionary);
        self
    }
}

#[derive(Debug)]
struct ReadState<F> {
    source: F,
    decompressor: Decompressor,
    input: Vec<u8>,
    buffer: Vec<u8>,
    buffer_pos: usize,
    /// Uncompressed position of the next byte handed out
    position: u64,
    eof: bool,
}

#[derive(Debug)]
struct WriteState<F> {
    sink: F,
    compressor: Compressor,
    position: u64,
}

#[derive(Debug)]
enum Mode<F> {
    Read(ReadState<F>),
    Write(WriteState<F>),
    Closed,
}

/// Compressed file opened for reading or writing
#[derive(Debug)]
pub struct ZFile<F: Read + Write + Seek> {
    mode: Mode<F>,
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "file is closed")
}

fn wrong_mode(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("file not open for {op}"))
}

impl ZFile<File> {
    /// Open `path` in `mode` ("r", "rb", "w", "wb", "a", "ab", "x", "xb")
    pub fn open<P: AsRef<Path>>(path: P, mode: &str, options: FileOptions) -> Result<Self> {
        let mode = FileMode::parse(mode)?;
        let path = path.as_ref();
        let file = match mode {
            FileMode::Read => File::open(path)?,
            FileMode::Write => File::create(path)?,
            FileMode::Append => OpenOptions::new().read(true).append(true).create(true).open(path)?,
            FileMode::Exclusive => OpenOptions::new().read(true).write(true).create_new(true).open(path)?,
        };
        log::debug!("opened {} in {mode:?} mode", path.display());
        Self::new(file, mode, options)
    }
}

impl<F: Read + Write + Seek> ZFile<F> {
    /// Wrap an already open stream
    pub fn new(inner: F, mode: FileMode, options: FileOptions) -> Result<Self> {
        if options.read_size == 0 {
            return Err(CodecError::config("read size must be positive"));
        }
        let mode = if mode.is_read() {
            let decompressor = match options.dictionary {
                Some(dict) => Decompressor::with_dictionary(&options.decompression, dict),
                None => Decompressor::new(&options.decompression),
            };
            Mode::Read(ReadState {
                source: inner,
                decompressor,
                input: vec![0; options.read_size],
                buffer: Vec::new(),
                buffer_pos: 0,
                position: 0,
                eof: false,
            })
        } else {
            let compressor = match options.dictionary {
                Some(dict) => Compressor::with_dictionary(&options.compression, dict)?,
                None => Compressor::new(&options.compression)?,
            };
            Mode::Write(WriteState {
                sink: inner,
                compressor,
                position: 0,
            })
        };
        Ok(Self { mode })
    }

    /// Uncompressed position
    pub fn tell(&self) -> u64 {
        match &self.mode {
            Mode::Read(state) => state.position,
            Mode::Write(state) => state.position,
            Mode::Closed => 0,
        }
    }

    /// True after [`close`](Self::close)
    pub fn is_closed(&self) -> bool {
        matches!(self.mode, Mode::Closed)
    }

    /// Write the frame trailer (write modes) and release the stream
    pub fn close(&mut self) -> Result<()> {
        self.finish_frame()?;
        self.mode = Mode::Closed;
        Ok(())
    }

    /// Close and hand back the underlying stream
    pub fn into_inner(mut self) -> Result<F> {
        self.finish_frame()?;
        match std::mem::replace(&mut self.mode, Mode::Closed) {
            Mode::Read(state) => Ok(state.source),
            Mode::Write(state) => Ok(state.sink),
            Mode::Closed => Err(CodecError::SessionClosed),
        }
    }

    fn finish_frame(&mut self) -> Result<()> {
        if let Mode::Write(state) = &mut self.mode {
            if !state.compressor.is_finished() {
                let tail = state.compressor.finish()?;
                state.sink.write_all(&tail)?;
                state.sink.flush()?;
            }
        }
        Ok(())
    }
}

impl<F: Read + Write + Seek> ReadState<F> {
    fn refill(&mut self) -> Result<()> {
        self.buffer.clear();
        self.buffer_pos = 0;
        while self.buffer.is_empty() && !self.eof {
            let n = self.source.read(&mut self.input)?;
            if n == 0 {
                self.decompressor.finish()?;
                self.eof = true;
                break;
            }
            self.decompressor
                .decompress_into(&self.input[..n], &mut self.buffer)?;
        }
        Ok(())
    }

    fn available(&mut self) -> Result<&[u8]> {
        if self.buffer_pos >= self.buffer.len() && !self.eof {
            self.refill()?;
        }
        Ok(&self.buffer[self.buffer_pos..])
    }

    fn advance(&mut self, n: usize) {
        let n = n.min(self.buffer.len() - self.buffer_pos);
        self.buffer_pos += n;
        self.position += n as u64;
    }

    fn rewind(&mut self) -> Result<()> {
        self.source.seek(SeekFrom::Start(0))?;
        self.decompressor.reset();
        self.buffer.clear();
        self.buffer_pos = 0;
        self.position = 0;
        self.eof = false;
        log::trace!("rewound compressed source");
        Ok(())
    }

    /// Decompress and drop content until `target` or the end
    fn skip_to(&mut self, target: u64) -> Result<()> {
        while self.position < target {
            let remaining = target - self.position;
            let chunk = self.available()?.len();
            if chunk == 0 {
                break;
            }
            self.advance(chunk.min(remaining.min(usize::MAX as u64) as usize));
        }
        Ok(())
    }
}

impl<F: Read + Write + Seek> Read for ZFile<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<F: Read + Write + Seek> BufRead for ZFile<F> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match &mut self.mode {
            Mode::Read(state) => Ok(state.available()?),
            Mode::Write(_) => Err(wrong_mode("reading")),
            Mode::Closed => Err(closed_error()),
        }
    }

    fn consume(&mut self, amt: usize) {
        if let Mode::Read(state) = &mut self.mode {
            state.advance(amt);
        }
    }
}

impl<F: Read + Write + Seek> Seek for ZFile<F> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let state = match &mut self.mode {
            Mode::Read(state) => state,
            Mode::Write(_) => return Err(wrong_mode("seeking")),
            Mode::Closed => return Err(closed_error()),
        };
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => state.position as i128 + delta as i128,
            SeekFrom::End(delta) => {
                state.skip_to(u64::MAX)?;
                state.position as i128 + delta as i128
            }
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the content",
            ));
        }
        let target = target as u64;
        if target < state.position {
            state.rewind()?;
        }
        state.skip_to(target)?;
        Ok(state.position)
    }
}

impl<F: Read + Write + Seek> Write for ZFile<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let state = match &mut self.mode {
            Mode::Write(state) => state,
            Mode::Read(_) => return Err(wrong_mode("writing")),
            Mode::Closed => return Err(closed_error()),
        };
        let out = state.compressor.push(buf)?;
        state.sink.write_all(&out)?;
        state.position += buf.len() as u64;
        Ok(buf.len())
    }

    /// Ends the current block so everything written so far can be decoded
    fn flush(&mut self) -> io::Result<()> {
        match &mut self.mode {
            Mode::Write(state) => {
                let out = state.compressor.flush()?;
                state.sink.write_all(&out)?;
                state.sink.flush()
            }
            _ => Ok(()),
        }
    }
}

impl<F: Read + Write + Seek> Drop for ZFile<F> {
    fn drop(&mut self) {
        // Errors cannot be reported from drop
        let _ = self.finish_frame();
    }
}
