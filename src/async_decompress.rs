//! Async decompression module
//!
//! [`AsyncDecompressReader`] pulls compressed bytes from a tokio `AsyncRead`
//! and yields decompressed chunks as a `Stream`. Concatenated frames are
//! decoded back to back unless the parameters ask for a single frame.

#[cfg(feature = "async")]
/// Async streaming decompression
pub mod reader {
    use crate::decompress::Decompressor;
    use crate::dictionary::Dictionary;
    use crate::params::DecompressionParams;
    use crate::{CodecError, Result};
    use bytes::Bytes;
    use futures::{ready, Stream, TryStreamExt};
    use pin_project::pin_project;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    const DEFAULT_READ_SIZE: usize = 32 * 1024;

    /// Async reader yielding decompressed content chunks
    #[pin_project]
    #[derive(Debug)]
    pub struct AsyncDecompressReader<R: AsyncRead> {
        #[pin]
        reader: R,
        decompressor: Decompressor,
        read_buffer: Vec<u8>,
        finished: bool,
    }

    impl<R: AsyncRead> AsyncDecompressReader<R> {
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
                read_buffer: vec![0; DEFAULT_READ_SIZE],
                finished: false,
            }
        }

        /// Bytes pulled from the source per read
        pub fn with_read_size(mut self, size: usize) -> Self {
            self.read_buffer = vec![0; size.max(1)];
            self
        }

        /// Number of frames fully decoded so far
        pub fn frames_completed(&self) -> u64 {
            self.decompressor.frames_completed()
        }

        /// Collect the whole decompressed stream
        pub async fn read_to_end(self) -> Result<Vec<u8>> {
            let chunks: Vec<Bytes> = self.try_collect().await?;
            let total = chunks.iter().map(Bytes::len).sum();
            let mut out = Vec::with_capacity(total);
            for chunk in chunks {
                out.extend_from_slice(&chunk);
            }
            Ok(out)
        }
    }

    impl<R: AsyncRead> Stream for AsyncDecompressReader<R> {
        type Item = Result<Bytes>;

        fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            let mut this = self.project();
            loop {
                if *this.finished {
                    return Poll::Ready(None);
                }

                let mut buf = ReadBuf::new(this.read_buffer);
                if let Err(e) = ready!(this.reader.as_mut().poll_read(cx, &mut buf)) {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(CodecError::Io(e))));
                }
                let filled = buf.filled();

                if filled.is_empty() {
                    *this.finished = true;
                    return match this.decompressor.finish() {
                        Ok(()) => Poll::Ready(None),
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }

                let mut out = Vec::new();
                if let Err(e) = this.decompressor.decompress_into(filled, &mut out) {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                if this.decompressor.eof() {
                    *this.finished = true;
                }
                if !out.is_empty() {
                    return Poll::Ready(Some(Ok(Bytes::from(out))));
                }
            }
        }
    }

}

#[cfg(feature = "async")]
pub use reader::AsyncDecompressReader;
