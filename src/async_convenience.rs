//! Async convenience functions
//!
//! One-call async entry points for whole readers, byte slices and files.

#[cfg(feature = "async")]
/// Whole-input async compression and decompression helpers
pub mod functions {
    use crate::async_compress::AsyncCompressWriter;
    use crate::async_decompress::AsyncDecompressReader;
    use crate::dictionary::Dictionary;
    use crate::params::CompressionParams;
    use crate::{CompressionStats, Result};
    use bytes::Bytes;
    use futures::TryStreamExt;
    use std::path::Path;
    use std::sync::Arc;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

    const READ_CHUNK: usize = 64 * 1024;

    /// Decompress every frame from an async reader
    pub async fn decompress_async<R: AsyncRead + Unpin>(reader: R) -> Result<Vec<u8>> {
        AsyncDecompressReader::new(reader).read_to_end().await
    }

    /// Decompress every frame from an async reader using `dictionary`
    pub async fn decompress_with_dictionary_async<R: AsyncRead + Unpin>(
        reader: R,
        dictionary: Arc<Dictionary>,
    ) -> Result<Vec<u8>> {
        AsyncDecompressReader::with_dictionary(reader, &Default::default(), dictionary)
            .read_to_end()
            .await
    }

    /// Compress everything an async reader yields into one frame
    pub async fn compress_async<R: AsyncRead + Unpin>(reader: R, params: &CompressionParams) -> Result<Vec<u8>> {
        let writer = AsyncCompressWriter::new(Vec::new(), params)?;
        pump(reader, writer).await
    }

    /// Compress an async reader into one frame using `dictionary`
    pub async fn compress_with_dictionary_async<R: AsyncRead + Unpin>(
        reader: R,
        params: &CompressionParams,
        dictionary: Arc<Dictionary>,
    ) -> Result<Vec<u8>> {
        let writer = AsyncCompressWriter::with_dictionary(Vec::new(), params, dictionary)?;
        pump(reader, writer).await
    }

    async fn pump<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
        reader: R,
        mut writer: AsyncCompressWriter<W>,
    ) -> Result<W> {
        let mut reader = BufReader::new(reader);
        let mut buffer = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            writer.write_chunk(&buffer[..n]).await?;
        }
        writer.finish().await
    }

    /// Compress a byte slice
    pub async fn compress_bytes_async(data: &[u8], params: &CompressionParams) -> Result<Vec<u8>> {
        let mut writer = AsyncCompressWriter::new(Vec::new(), params)?;
        writer.set_pledged_size(data.len() as u64)?;
        writer.write_chunk(data).await?;
        writer.finish().await
    }

    /// Decompress a byte slice
    pub async fn decompress_bytes_async(data: &[u8]) -> Result<Vec<u8>> {
        decompress_async(data).await
    }

    /// Compress `input_path` into `output_path`
    pub async fn compress_file<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_path: P1,
        output_path: P2,
        params: &CompressionParams,
    ) -> Result<CompressionStats> {
        let input = tokio::fs::File::open(input_path).await?;
        let size = input.metadata().await?.len();
        let output = tokio::fs::File::create(output_path).await?;

        let mut writer = AsyncCompressWriter::new(BufWriter::new(output), params)?;
        writer.set_pledged_size(size)?;
        let mut reader = BufReader::new(input);
        let mut buffer = vec![0u8; READ_CHUNK];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            writer.write_chunk(&buffer[..n]).await?;
        }
        writer.shutdown().await?;
        let stats = writer.stats().clone();
        log::debug!("compressed {} bytes into {}", stats.input_bytes, stats.output_bytes);
        Ok(stats)
    }

    /// Decompress `input_path` into `output_path`
    pub async fn decompress_file<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_path: P1,
        output_path: P2,
    ) -> Result<CompressionStats> {
        let input = tokio::fs::File::open(input_path).await?;
        let compressed = input.metadata().await?.len();
        let output = tokio::fs::File::create(output_path).await?;
        let mut writer = BufWriter::new(output);

        let mut reader = AsyncDecompressReader::new(input);
        let mut total = 0u64;
        while let Some(chunk) = reader.try_next().await? {
            writer.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        writer.flush().await?;

        Ok(CompressionStats {
            input_bytes: total,
            output_bytes: compressed,
            ..Default::default()
        })
    }

    /// Compress several files concurrently
    pub async fn compress_files<P: AsRef<Path> + Send + Sync>(
        files: Vec<P>,
        params: CompressionParams,
        concurrency: Option<usize>,
    ) -> Result<Vec<(std::path::PathBuf, Vec<u8>)>> {
        use crate::async_batch::AsyncBatchProcessor;

        let mut processor = AsyncBatchProcessor::new().with_params(params);
        if let Some(limit) = concurrency {
            processor = processor.with_concurrency(limit);
        }
        processor.compress_files(files).await
    }

    /// Utilities for working with async streams
    pub mod stream_utils {
        use super::*;
        use futures::Stream;

        /// Split data into a stream of chunks
        pub fn data_to_stream(data: Vec<u8>, chunk_size: usize) -> impl Stream<Item = Result<Bytes>> {
            let data = Bytes::from(data);
            let chunk_size = chunk_size.max(1);
            let chunks: Vec<Result<Bytes>> = (0..data.len())
                .step_by(chunk_size)
                .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
                .collect();
            futures::stream::iter(chunks)
        }

        /// Collect a stream of chunks back into one buffer
        pub async fn stream_to_data<S>(stream: S) -> Result<Vec<u8>>
        where
            S: Stream<Item = Result<Bytes>>,
        {
            let chunks: Vec<Bytes> = stream.try_collect().await?;
            let mut out = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
            for chunk in chunks {
                out.extend_from_slice(&chunk);
            }
            Ok(out)
        }

        /// Compress a stream of chunks into one frame
        pub async fn compress_stream<S>(stream: S, params: &CompressionParams) -> Result<Vec<u8>>
        where
            S: Stream<Item = Result<Bytes>> + Unpin,
        {
            let mut stream = stream;
            let mut writer = AsyncCompressWriter::new(Vec::new(), params)?;
            while let Some(chunk) = stream.try_next().await? {
                writer.write_chunk(&chunk).await?;
            }
            writer.finish().await
        }
    }

    #[cfg(test)]
    mod tests {
        use super::stream_utils::*;
        use super::*;

        #[tokio::test]
        async fn test_bytes_round_trip() {
            let data = b"convenience wrappers ".repeat(300);
            let frame = compress_bytes_async(&data, &CompressionParams::default())
                .await
                .unwrap();
            assert!(frame.len() < data.len());
            assert_eq!(decompress_bytes_async(&frame).await.unwrap(), data);
        }

        #[tokio::test]
        async fn test_reader_round_trip() {
            let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
            let frame = compress_async(&data[..], &CompressionParams::from_level(5).unwrap())
                .await
                .unwrap();
            assert_eq!(decompress_async(&frame[..]).await.unwrap(), data);
        }

        #[tokio::test]
        async fn test_file_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let source = dir.path().join("plain.txt");
            let packed = dir.path().join("plain.zc");
            let restored = dir.path().join("restored.txt");
            let data = b"file level helpers ".repeat(1000);
            std::fs::write(&source, &data).unwrap();

            let stats = compress_file(&source, &packed, &CompressionParams::default())
                .await
                .unwrap();
            assert_eq!(stats.input_bytes, data.len() as u64);
            assert_eq!(stats.output_bytes, std::fs::metadata(&packed).unwrap().len());

            let stats = decompress_file(&packed, &restored).await.unwrap();
            assert_eq!(stats.input_bytes, data.len() as u64);
            assert_eq!(std::fs::read(&restored).unwrap(), data);
        }

        #[tokio::test]
        async fn test_stream_helpers() {
            let data = b"chunked stream ".repeat(100);
            let chunks = data_to_stream(data.clone(), 7);
            let frame = compress_stream(chunks, &CompressionParams::default())
                .await
                .unwrap();
            let restored = stream_to_data(AsyncDecompressReader::new(&frame[..]))
                .await
                .unwrap();
            assert_eq!(restored, data);
        }
    }
}

#[cfg(feature = "async")]
pub use functions::*;
