//! Property-based tests for zcodec
//!
//! These tests use randomized inputs to verify correctness across a wide range
//! of data patterns and edge cases.

use proptest::prelude::*;
use zcodec::{
    compress, compress_bound, decompress, CompressionParams, Compressor, DecompressionParams,
    Decompressor, Strategy as MatchStrategy,
};

/// Input mixing random bytes with repeated slices of themselves
fn repetitive_data() -> impl Strategy<Value = Vec<u8>> {
    (
        prop::collection::vec(any::<u8>(), 1..64),
        prop::collection::vec((0usize..64, 1usize..40), 0..40),
    )
        .prop_map(|(seed, copies)| {
            let mut data = seed.clone();
            for (start, len) in copies {
                let start = start % data.len();
                let end = (start + len).min(data.len());
                let piece = data[start..end].to_vec();
                data.extend_from_slice(&piece);
                data.push(seed[len % seed.len()]);
            }
            data
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_decompression_never_panics(data in prop::collection::vec(any::<u8>(), 0..1000)) {
        // Random bytes are almost never a frame; they must fail cleanly
        let _ = decompress(&data);
    }

    #[test]
    fn test_frame_mutation_never_panics(
        data in repetitive_data(),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut frame = compress(&data, &CompressionParams::default()).unwrap();
        let i = index.index(frame.len());
        frame[i] ^= flip;
        // Either detected or, for bytes the format does not depend on, harmless
        if let Ok(out) = decompress(&frame) {
            prop_assert_eq!(out.len(), data.len());
        }
    }

    #[test]
    fn test_round_trip_any_level(
        data in prop::collection::vec(any::<u8>(), 0..2000),
        level in 1i32..=22,
    ) {
        let frame = compress(&data, &CompressionParams::from_level(level).unwrap()).unwrap();
        prop_assert_eq!(decompress(&frame).unwrap(), data);
    }

    #[test]
    fn test_round_trip_repetitive(data in repetitive_data(), strategy_id in 1i32..=9) {
        let strategy = MatchStrategy::from_i32(strategy_id).unwrap();
        let params = CompressionParams::default().with_strategy(strategy).unwrap();
        let frame = compress(&data, &params).unwrap();
        prop_assert_eq!(decompress(&frame).unwrap(), data);
    }

    #[test]
    fn test_size_bound(data in prop::collection::vec(any::<u8>(), 0..4000), level in 1i32..=22) {
        let frame = compress(&data, &CompressionParams::from_level(level).unwrap()).unwrap();
        prop_assert!(frame.len() <= compress_bound(data.len()),
            "{} bytes grew to {} (bound {})", data.len(), frame.len(), compress_bound(data.len()));
    }

    #[test]
    fn test_chunked_push_equivalence(
        data in repetitive_data(),
        cuts in prop::collection::vec(1usize..50, 1..20),
    ) {
        let mut compressor = Compressor::with_level(3).unwrap();
        let mut frame = Vec::new();
        let mut rest = &data[..];
        for cut in cuts.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (chunk, tail) = rest.split_at((*cut).min(rest.len()));
            frame.extend(compressor.push(chunk).unwrap());
            rest = tail;
        }
        frame.extend(compressor.finish().unwrap());

        let mut decompressor = Decompressor::new(&DecompressionParams::default());
        let mut out = Vec::new();
        for chunk in frame.chunks(cuts[0]) {
            out.extend(decompressor.push(chunk).unwrap());
        }
        decompressor.finish().unwrap();
        prop_assert_eq!(out, data);
    }

    #[test]
    fn test_compression_deterministic(data in repetitive_data(), level in 1i32..=22) {
        let params = CompressionParams::from_level(level).unwrap();
        prop_assert_eq!(compress(&data, &params).unwrap(), compress(&data, &params).unwrap());
    }

    #[test]
    fn test_single_byte_runs(byte_value in any::<u8>(), size in 1..5000usize) {
        let data = vec![byte_value; size];
        let frame = compress(&data, &CompressionParams::default()).unwrap();
        // Header, one RLE block, checksum
        prop_assert!(frame.len() <= 24);
        prop_assert_eq!(decompress(&frame).unwrap(), data);
    }
}
