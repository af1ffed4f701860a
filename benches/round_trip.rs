use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::io::{Read, Write};
use std::time::Duration;
use zcodec::{compress, decompress, CompressWriter, CompressionParams, DecompressReader};

fn generate_test_data(size: usize, pattern: &str) -> Vec<u8> {
    match pattern {
        "text" => b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
            .iter()
            .cycle()
            .take(size)
            .copied()
            .collect(),
        "binary" => (0..size).map(|i| ((i * 17 + 11) % 256) as u8).collect(),
        "json" => {
            let mut data = Vec::with_capacity(size);
            let mut id = 0u32;
            while data.len() < size {
                data.extend_from_slice(
                    format!(
                        r#"{{"id":{id},"name":"item-{}","values":[{},{},{}],"active":{}}},"#,
                        id % 97,
                        id % 7,
                        id % 11,
                        id % 13,
                        id % 2 == 0
                    )
                    .as_bytes(),
                );
                id += 1;
            }
            data.truncate(size);
            data
        }
        _ => panic!("Unknown pattern: {pattern}"),
    }
}

fn round_trip_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip_throughput");
    group.measurement_time(Duration::from_secs(10));

    for (size, size_label) in [(1024usize, "1KB"), (102_400, "100KB"), (1_048_576, "1MB")] {
        for pattern in ["text", "binary", "json"] {
            let data = generate_test_data(size, pattern);
            for level in [1, 3, 9] {
                let params = CompressionParams::from_level(level).expect("valid level");
                group.throughput(Throughput::Bytes(size as u64));
                group.bench_with_input(
                    BenchmarkId::from_parameter(format!("{size_label}/{pattern}/level{level}")),
                    &data,
                    |b, data| {
                        b.iter(|| {
                            let compressed =
                                compress(black_box(data), &params).expect("Compression failed");
                            let decompressed =
                                decompress(black_box(&compressed)).expect("Decompression failed");
                            assert_eq!(data.len(), decompressed.len());
                            decompressed
                        });
                    },
                );
            }
        }
    }
    group.finish();
}

/// Round trip through the `Write`/`Read` adapters
fn round_trip_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip_streaming");
    group.sample_size(20);

    let data = generate_test_data(4 * 1_048_576, "json");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for write_chunk in [512usize, 65_536] {
        group.bench_with_input(
            BenchmarkId::from_parameter(write_chunk),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut writer = CompressWriter::new(Vec::new(), &CompressionParams::default())
                        .expect("Writer creation failed");
                    for chunk in data.chunks(write_chunk) {
                        writer.write_all(black_box(chunk)).expect("Write failed");
                    }
                    let compressed = writer.finish().expect("Finish failed");

                    let mut reader = DecompressReader::new(compressed.as_slice());
                    let mut out = Vec::with_capacity(data.len());
                    reader.read_to_end(&mut out).expect("Read failed");
                    assert_eq!(out.len(), data.len());
                    out
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, round_trip_throughput, round_trip_streaming);
criterion_main!(benches);
