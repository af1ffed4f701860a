//! Async batch processing module
//!
//! Independent compression sessions run concurrently, one per file or
//! buffer. A trained dictionary is shared between sessions through an `Arc`.

#[cfg(feature = "async")]
/// Concurrent compression of many inputs with a configurable limit
pub mod processor {
    use crate::compress::Compressor;
    use crate::decompress::decompress_with_dictionary;
    use crate::dictionary::Dictionary;
    use crate::params::CompressionParams;
    use crate::{CodecError, CompressionStats, Result};
    use futures::stream::{self, StreamExt, TryStreamExt};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio::fs::File;
    use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

    /// Concurrent compressor for batches of files or buffers
    #[derive(Debug, Clone)]
    pub struct AsyncBatchProcessor {
        concurrency_limit: usize,
        chunk_size: usize,
        params: CompressionParams,
        dictionary: Option<Arc<Dictionary>>,
    }

    impl AsyncBatchProcessor {
        /// One session per CPU, default parameters, no dictionary
        pub fn new() -> Self {
            Self {
                concurrency_limit: num_cpus::get(),
                chunk_size: 64 * 1024,
                params: CompressionParams::default(),
                dictionary: None,
            }
        }

        /// Set the number of sessions running at once
        pub fn with_concurrency(mut self, limit: usize) -> Self {
            self.concurrency_limit = limit.max(1);
            self
        }

        /// Set the read size used when streaming files
        pub fn with_chunk_size(mut self, size: usize) -> Self {
            self.chunk_size = size.max(1);
            self
        }

        /// Compression parameters for every session
        pub fn with_params(mut self, params: CompressionParams) -> Self {
            self.params = params;
            self
        }

        /// Dictionary shared by every session
        pub fn with_dictionary(mut self, dictionary: Arc<Dictionary>) -> Self {
            self.dictionary = Some(dictionary);
            self
        }

        fn compressor(&self) -> Result<Compressor> {
            match &self.dictionary {
                Some(dict) => Compressor::with_dictionary(&self.params, Arc::clone(dict)),
                None => Compressor::new(&self.params),
            }
        }

        /// Compress every file; results arrive in completion order
        pub async fn compress_files<P: AsRef<Path> + Send + Sync>(
            &self,
            files: Vec<P>,
        ) -> Result<Vec<(PathBuf, Vec<u8>)>> {
            stream::iter(files.into_iter().map(|path| {
                let processor = self.clone();
                async move {
                    let (path, frame, _) = processor.compress_single_file(path).await?;
                    Ok((path, frame))
                }
            }))
            .buffer_unordered(self.concurrency_limit)
            .try_collect()
            .await
        }

        /// Compress every file, yielding per-file statistics as each completes
        pub fn compress_files_streaming<P: AsRef<Path> + Send + Sync + 'static>(
            &self,
            files: Vec<P>,
        ) -> impl futures::Stream<Item = Result<(PathBuf, CompressionStats)>> + '_ {
            stream::iter(files.into_iter().map(move |path| {
                let processor = self.clone();
                async move {
                    let (path, _, stats) = processor.compress_single_file(path).await?;
                    Ok((path, stats))
                }
            }))
            .buffer_unordered(self.concurrency_limit)
        }

        /// Compress in-memory buffers on the blocking pool, keeping input order
        pub async fn compress_buffers(&self, buffers: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>> {
            stream::iter(buffers.into_iter().map(|data| {
                let processor = self.clone();
                async move {
                    tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
                        let mut compressor = processor.compressor()?;
                        compressor.set_pledged_size(data.len() as u64)?;
                        let mut frame = compressor.push(&data)?;
                        frame.extend(compressor.finish()?);
                        Ok(frame)
                    })
                    .await
                    .map_err(join_error)?
                }
            }))
            .buffered(self.concurrency_limit)
            .try_collect()
            .await
        }

        /// Decompress frames on the blocking pool, keeping input order
        pub async fn decompress_buffers(&self, frames: Vec<Vec<u8>>) -> Result<Vec<Vec<u8>>> {
            stream::iter(frames.into_iter().map(|frame| {
                let dictionary = self.dictionary.clone();
                async move {
                    tokio::task::spawn_blocking(move || match dictionary {
                        Some(dict) => decompress_with_dictionary(&frame, dict),
                        None => crate::decompress::decompress(&frame),
                    })
                    .await
                    .map_err(join_error)?
                }
            }))
            .buffered(self.concurrency_limit)
            .try_collect()
            .await
        }

        async fn compress_single_file<P: AsRef<Path>>(
            &self,
            path: P,
        ) -> Result<(PathBuf, Vec<u8>, CompressionStats)> {
            let path = path.as_ref();
            let file = File::open(path).await?;
            let (frame, stats) = self.compress_reader(BufReader::new(file)).await?;
            log::debug!(
                "compressed {} ({} -> {} bytes)",
                path.display(),
                stats.input_bytes,
                stats.output_bytes
            );
            Ok((path.to_path_buf(), frame, stats))
        }

        async fn compress_reader<R: AsyncRead + Unpin>(
            &self,
            mut reader: R,
        ) -> Result<(Vec<u8>, CompressionStats)> {
            let mut compressor = self.compressor()?;
            let mut output = Vec::new();
            let mut buffer = vec![0u8; self.chunk_size];
            loop {
                let n = reader.read(&mut buffer).await?;
                if n == 0 {
                    break;
                }
                output.extend(compressor.push(&buffer[..n])?);

                // Let sibling sessions progress between full reads
                if n == self.chunk_size {
                    tokio::task::yield_now().await;
                }
            }
            output.extend(compressor.finish()?);
            Ok((output, compressor.stats().clone()))
        }
    }

    impl Default for AsyncBatchProcessor {
        fn default() -> Self {
            Self::new()
        }
    }

    fn join_error(err: tokio::task::JoinError) -> CodecError {
        CodecError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
    }

}

#[cfg(feature = "async")]
pub use processor::AsyncBatchProcessor;
