use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use zcodec::{
    compress, compress_with_dictionary, decompress, decompress_with_dictionary, train_dictionary,
    CompressionParams, Dictionary,
};

fn generate_test_files(count: usize, size_per_file: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| {
            // Slightly different data for each file
            let base = format!("File {i} content: Lorem ipsum dolor sit amet. ");
            base.as_bytes().iter().cycle().take(size_per_file).copied().collect()
        })
        .collect()
}

/// Compress every file on `thread_count` workers sharing one queue
fn compress_on_threads(
    files: &[Vec<u8>],
    thread_count: usize,
    dictionary: Option<Arc<Dictionary>>,
) -> Vec<(usize, Vec<u8>)> {
    let work_queue = Arc::new(Mutex::new(
        files.iter().cloned().enumerate().collect::<Vec<_>>(),
    ));
    let results = Arc::new(Mutex::new(Vec::with_capacity(files.len())));
    let params = CompressionParams::default();

    let handles: Vec<_> = (0..thread_count)
        .map(|_| {
            let queue = Arc::clone(&work_queue);
            let results = Arc::clone(&results);
            let dictionary = dictionary.clone();
            let params = params.clone();
            thread::spawn(move || loop {
                let work_item = queue.lock().unwrap().pop();
                let Some((idx, data)) = work_item else {
                    break;
                };
                let compressed = match &dictionary {
                    Some(dict) => compress_with_dictionary(&data, &params, Arc::clone(dict)),
                    None => compress(&data, &params),
                }
                .expect("Compression failed");
                results.lock().unwrap().push((idx, compressed));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    let mut results = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
    results.sort_by_key(|(idx, _)| *idx);
    results
}

/// Independent sessions in parallel
fn parallel_file_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_compression");
    group.measurement_time(Duration::from_secs(20));
    group.sample_size(20);

    for (file_count, file_size) in [(10usize, 102_400usize), (100, 10_240), (1000, 1024)] {
        let files = generate_test_files(file_count, file_size);
        group.throughput(Throughput::Bytes((file_count * file_size) as u64));
        for thread_count in [1usize, 2, 4, 8] {
            let id = format!("{}files_{}KB_{}threads", file_count, file_size / 1024, thread_count);
            group.bench_with_input(BenchmarkId::from_parameter(id), &files, |b, files| {
                b.iter(|| compress_on_threads(black_box(files), thread_count, None));
            });
        }
    }
    group.finish();
}

/// Many small inputs sharing one dictionary across threads
fn shared_dictionary_compression(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_dictionary");
    group.sample_size(20);

    let files = generate_test_files(2000, 300);
    let dict = Arc::new(train_dictionary(&files, 8 * 1024).expect("Training failed"));
    group.throughput(Throughput::Bytes((files.len() * 300) as u64));
    for thread_count in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}threads", thread_count)),
            &files,
            |b, files| {
                b.iter(|| compress_on_threads(black_box(files), thread_count, Some(Arc::clone(&dict))));
            },
        );
    }
    group.finish();
}

/// Decompressing independent frames in parallel
fn parallel_decompression(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_decompression");
    group.sample_size(20);

    let files = generate_test_files(100, 10_240);
    let dict = Arc::new(train_dictionary(&files, 4096).expect("Training failed"));
    let frames: Vec<Vec<u8>> = compress_on_threads(&files, 4, Some(Arc::clone(&dict)))
        .into_iter()
        .map(|(_, frame)| frame)
        .collect();
    group.throughput(Throughput::Bytes((files.len() * 10_240) as u64));

    for thread_count in [1usize, 4] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}threads", thread_count)),
            &frames,
            |b, frames| {
                b.iter(|| {
                    thread::scope(|scope| {
                        for part in frames.chunks(frames.len().div_ceil(thread_count)) {
                            let dict = Arc::clone(&dict);
                            scope.spawn(move || {
                                for frame in part {
                                    black_box(
                                        decompress_with_dictionary(frame, Arc::clone(&dict))
                                            .expect("Decompression failed"),
                                    );
                                }
                            });
                        }
                    });
                });
            },
        );
    }

    let plain: Vec<Vec<u8>> = files
        .iter()
        .map(|f| compress(f, &CompressionParams::default()).expect("Compression failed"))
        .collect();
    group.bench_function("sequential_without_dictionary", |b| {
        b.iter(|| {
            for frame in &plain {
                black_box(decompress(frame).expect("Decompression failed"));
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    parallel_file_compression,
    shared_dictionary_compression,
    parallel_decompression
);
criterion_main!(benches);
