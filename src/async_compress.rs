//! Async compression module
//!
//! [`AsyncCompressWriter`] drives a [`Compressor`](crate::Compressor) behind
//! tokio's `AsyncWrite`. Compressed output is queued and drained into the
//! inner writer before more input is accepted, so memory stays bounded by
//! one block plus its output.

#[cfg(feature = "async")]
/// Async streaming compression
pub mod writer {
    use crate::compress::Compressor;
    use crate::dictionary::Dictionary;
    use crate::params::CompressionParams;
    use crate::{CompressionStats, Result};
    use futures::ready;
    use pin_project::pin_project;
    use std::io;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    /// Async writer producing one compressed frame
    #[pin_project]
    #[derive(Debug)]
    pub struct AsyncCompressWriter<W: AsyncWrite + Unpin> {
        #[pin]
        writer: W,
        compressor: Compressor,
        /// Compressed bytes not yet accepted by `writer`
        output: Vec<u8>,
        output_pos: usize,
    }

    impl<W: AsyncWrite + Unpin> AsyncCompressWriter<W> {
        /// Create a writer with explicit parameters
        pub fn new(writer: W, params: &CompressionParams) -> Result<Self> {
            Ok(Self::from_compressor(writer, Compressor::new(params)?))
        }

        /// Create a writer from a level preset
        pub fn with_level(writer: W, level: i32) -> Result<Self> {
            Self::new(writer, &CompressionParams::from_level(level)?)
        }

        /// Create a writer primed with `dictionary`
        pub fn with_dictionary(writer: W, params: &CompressionParams, dictionary: Arc<Dictionary>) -> Result<Self> {
            Ok(Self::from_compressor(
                writer,
                Compressor::with_dictionary(params, dictionary)?,
            ))
        }

        fn from_compressor(writer: W, compressor: Compressor) -> Self {
            Self {
                writer,
                compressor,
                output: Vec::new(),
                output_pos: 0,
            }
        }

        /// Announce the exact content size before writing
        pub fn set_pledged_size(&mut self, size: u64) -> Result<()> {
            self.compressor.set_pledged_size(size)
        }

        /// Session statistics so far
        pub fn stats(&self) -> &CompressionStats {
            self.compressor.stats()
        }

        /// Compress a chunk and write whatever output is ready
        pub async fn write_chunk(&mut self, data: &[u8]) -> Result<()> {
            let out = self.compressor.push(data)?;
            if !out.is_empty() {
                self.writer.write_all(&out).await?;
            }
            Ok(())
        }

        /// Close the frame and return the inner writer
        pub async fn finish(mut self) -> Result<W> {
            self.drain().await?;
            if !self.compressor.is_finished() {
                let tail = self.compressor.finish()?;
                self.writer.write_all(&tail).await?;
            }
            self.writer.flush().await?;
            Ok(self.writer)
        }

        async fn drain(&mut self) -> Result<()> {
            if self.output_pos < self.output.len() {
                self.writer.write_all(&self.output[self.output_pos..]).await?;
            }
            self.output.clear();
            self.output_pos = 0;
            Ok(())
        }

        /// Write queued output into the inner writer
        fn poll_drain(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            let mut this = self.project();
            while *this.output_pos < this.output.len() {
                let n = ready!(this
                    .writer
                    .as_mut()
                    .poll_write(cx, &this.output[*this.output_pos..]))?;
                if n == 0 {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "inner writer accepted no bytes",
                    )));
                }
                *this.output_pos += n;
            }
            this.output.clear();
            *this.output_pos = 0;
            Poll::Ready(Ok(()))
        }
    }

    impl<W: AsyncWrite + Unpin> AsyncWrite for AsyncCompressWriter<W> {
        fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            ready!(self.as_mut().poll_drain(cx))?;
            let this = self.project();
            let out = this.compressor.push(buf)?;
            this.output.extend_from_slice(&out);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            ready!(self.as_mut().poll_drain(cx))?;
            if !self.compressor.is_finished() {
                let this = self.as_mut().project();
                let out = this.compressor.flush()?;
                this.output.extend_from_slice(&out);
                ready!(self.as_mut().poll_drain(cx))?;
            }
            self.project().writer.poll_flush(cx)
        }

        fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            ready!(self.as_mut().poll_drain(cx))?;
            if !self.compressor.is_finished() {
                let this = self.as_mut().project();
                let out = this.compressor.finish()?;
                this.output.extend_from_slice(&out);
                ready!(self.as_mut().poll_drain(cx))?;
            }
            self.project().writer.poll_shutdown(cx)
        }
    }

}

#[cfg(feature = "async")]
pub use writer::AsyncCompressWriter;
