// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the samplog recorder

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

use samplog_recorder::{encode, scale, Logger, RecorderConfig, Scales, Sample, SyncMode};
use tempfile::TempDir;

// ============================================================================
// Codec Benchmarks
// ============================================================================

fn bench_scale_and_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let scales = Scales::new(1_000_000, 1_000).unwrap();

    group.bench_function("scale", |b| {
        b.iter(|| black_box(scale(black_box(1_700_000_000_123_456_789), black_box(1_000_000))))
    });

    group.bench_function("scale_and_encode", |b| {
        let sample = Sample::new(7, 1_700_000_000_123_456_789, 42_000);
        b.iter(|| black_box(black_box(sample).scaled(&scales).encode()))
    });

    group.bench_function("encode_raw", |b| {
        b.iter(|| black_box(encode(black_box(1), black_box(2), black_box(3))))
    });

    group.finish();
}

// ============================================================================
// Single-threaded Record Benchmarks
// ============================================================================

fn bench_record_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    group.throughput(Throughput::Elements(1));

    for capacity in [1usize, 1_024, 65_536] {
        group.bench_with_input(BenchmarkId::new("buffer_capacity", capacity), &capacity, |b, &capacity| {
            let dir = TempDir::new().unwrap();
            let config = RecorderConfig::new(dir.path().join("bench.log"))
                .with_buffer_capacity(capacity)
                .with_sync_mode(SyncMode::Async);
            let logger = Logger::open(config).unwrap();
            let mut i = 0u64;
            b.iter(|| {
                i += 1;
                logger.record(black_box(1), black_box(i), black_box(i)).unwrap()
            });
            logger.close().unwrap();
        });
    }

    group.finish();
}

// ============================================================================
// Contended Record Benchmarks
// ============================================================================

const RECORDS_PER_THREAD: u64 = 10_000;

fn bench_record_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_contended");

    for threads in [2u64, 4, 8] {
        group.throughput(Throughput::Elements(threads * RECORDS_PER_THREAD));
        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            let dir = TempDir::new().unwrap();
            let config = RecorderConfig::new(dir.path().join("contended.log"))
                .with_sync_mode(SyncMode::Async);
            let logger = Arc::new(Logger::open(config).unwrap());

            b.iter(|| {
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let logger = Arc::clone(&logger);
                        thread::spawn(move || {
                            for i in 0..RECORDS_PER_THREAD {
                                logger.record(t, i, i).unwrap();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
            logger.close().unwrap();
        });
    }

    group.finish();
}

criterion_group!(codec_benches, bench_scale_and_encode);

criterion_group!(
    record_benches,
    bench_record_single_thread,
    bench_record_contended
);

criterion_main!(codec_benches, record_benches);
