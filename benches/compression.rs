use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use zcodec::{
    compress, compress_with_dictionary, train_dictionary, CompressParameter, CompressionParams,
    Strategy,
};

fn generate_test_data(size: usize, pattern: &str) -> Vec<u8> {
    match pattern {
        "text" => {
            let base = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. ";
            base.iter().cycle().take(size).copied().collect()
        }
        "binary" => (0..size).map(|i| ((i * 17 + 11) % 256) as u8).collect(),
        "logs" => {
            let mut data = Vec::with_capacity(size);
            let mut i = 0u64;
            while data.len() < size {
                data.extend_from_slice(
                    format!(
                        "2024-03-{:02} 12:{:02}:{:02} INFO request handled path=/api/item/{} status=200\n",
                        i % 28 + 1,
                        i % 60,
                        i * 7 % 60,
                        i * 31 % 5000
                    )
                    .as_bytes(),
                );
                i += 1;
            }
            data.truncate(size);
            data
        }
        "random" => {
            let mut state = 0x2545_F491_4F6C_DD1Du64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    state as u8
                })
                .collect()
        }
        _ => panic!("Unknown pattern: {}", pattern),
    }
}

fn compression_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_levels");
    group.measurement_time(Duration::from_secs(10));

    let data = generate_test_data(1 << 20, "logs");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for level in [1, 3, 6, 9, 12, 16, 19, 22] {
        let params = CompressionParams::from_level(level).expect("valid level");
        group.bench_with_input(BenchmarkId::from_parameter(level), &data, |b, data| {
            b.iter(|| compress(black_box(data), &params).expect("Compression failed"));
        });
    }
    group.finish();
}

fn compression_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_patterns");
    group.measurement_time(Duration::from_secs(5));

    for size in [1024usize, 102_400, 1_048_576] {
        for pattern in ["text", "binary", "logs", "random"] {
            let data = generate_test_data(size, pattern);
            let params = CompressionParams::default();
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{}/{}", size, pattern)),
                &data,
                |b, data| {
                    b.iter(|| compress(black_box(data), &params).expect("Compression failed"));
                },
            );
        }
    }
    group.finish();
}

fn compression_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_strategies");
    group.sample_size(20);

    let data = generate_test_data(256 * 1024, "logs");
    group.throughput(Throughput::Bytes(data.len() as u64));
    for strategy in Strategy::ALL {
        let params = CompressionParams::default()
            .with_strategy(strategy)
            .expect("valid strategy");
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", strategy)),
            &data,
            |b, data| {
                b.iter(|| compress(black_box(data), &params).expect("Compression failed"));
            },
        );
    }

    let ldm = CompressionParams::default()
        .with(CompressParameter::EnableLongDistanceMatching, 1)
        .expect("valid flag");
    group.bench_with_input(BenchmarkId::from_parameter("Lazy+ldm"), &data, |b, data| {
        b.iter(|| compress(black_box(data), &ldm).expect("Compression failed"));
    });
    group.finish();
}

fn dictionary_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("dictionary_compression");

    let samples: Vec<Vec<u8>> = (0..500)
        .map(|i| generate_test_data(200 + i % 50, "logs"))
        .collect();
    let dict = Arc::new(train_dictionary(&samples, 16 * 1024).expect("Training failed"));
    let params = CompressionParams::default();
    let input = generate_test_data(300, "logs");

    group.bench_function("without_dictionary", |b| {
        b.iter(|| compress(black_box(&input), &params).expect("Compression failed"));
    });
    group.bench_function("with_dictionary", |b| {
        b.iter(|| {
            compress_with_dictionary(black_box(&input), &params, Arc::clone(&dict))
                .expect("Compression failed")
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    compression_levels,
    compression_patterns,
    compression_strategies,
    dictionary_compression
);
criterion_main!(benches);
