use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tracing_dedup::{format_timestamp, DedupCache, DedupConfig, EvictionReason, SummaryRecord};

fn new_cache(config: DedupConfig) -> DedupCache {
    DedupCache::new(config).unwrap()
}

/// Benchmark single-threaded classify-and-record throughput
fn bench_single_threaded_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_threaded");

    for threshold in [1usize, 10, 100].iter() {
        group.throughput(Throughput::Elements(1000));

        group.bench_with_input(
            BenchmarkId::new("check_and_record", threshold),
            threshold,
            |b, &threshold| {
                let cache = new_cache(DedupConfig::default().with_threshold(threshold));

                b.iter(|| {
                    for _ in 0..1000 {
                        black_box(cache.check_and_record(black_box("Test message")));
                    }
                })
            },
        );
    }

    group.finish();
}

/// Benchmark multi-threaded concurrent throughput
fn bench_concurrent_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8].iter() {
        group.throughput(Throughput::Elements((*num_threads as u64) * 1000));

        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let cache = Arc::new(new_cache(DedupConfig::default()));

                    let mut handles = vec![];
                    for i in 0..num_threads {
                        let cache = Arc::clone(&cache);
                        let handle = std::thread::spawn(move || {
                            // One lock guards the whole cache, so distinct keys still contend
                            let key = format!("Message {}", i);
                            for _ in 0..1000 {
                                black_box(cache.check_and_record(black_box(&key)));
                            }
                        });
                        handles.push(handle);
                    }

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

/// Benchmark different key populations
fn bench_key_diversity(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_diversity");
    group.throughput(Throughput::Elements(1000));

    // Single key (history grows, no evictions)
    group.bench_function("single_key", |b| {
        let cache = new_cache(DedupConfig::default());

        b.iter(|| {
            for _ in 0..1000 {
                black_box(cache.record_and_evict(black_box("Same message")));
            }
        })
    });

    // 10 keys, all resident
    group.bench_function("10_keys", |b| {
        let cache = new_cache(DedupConfig::default());
        let keys: Vec<_> = (0..10).map(|i| format!("Message {}", i)).collect();

        b.iter(|| {
            for i in 0..1000 {
                black_box(cache.record_and_evict(black_box(&keys[i % 10])));
            }
        })
    });

    // 1000 keys over capacity 500 (every insert evicts)
    group.bench_function("1000_keys_capacity_churn", |b| {
        let cache = new_cache(DedupConfig::default());
        let keys: Vec<_> = (0..1000).map(|i| format!("Message {}", i)).collect();

        b.iter(|| {
            for key in &keys {
                black_box(cache.record_and_evict(black_box(key)));
            }
        })
    });

    group.finish();
}

/// Benchmark cache fill and flush
fn bench_cache_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_scaling");

    for num_keys in [100, 1000, 10_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("fill_and_flush", num_keys),
            num_keys,
            |b, &num_keys| {
                b.iter(|| {
                    let cache = new_cache(DedupConfig::default().with_capacity(num_keys));

                    for i in 0..num_keys {
                        cache.record_and_evict(&format!("Message {}", i));
                    }
                    black_box(cache.flush_all())
                })
            },
        );
    }

    group.finish();
}

/// Benchmark summary rendering
fn bench_summary_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_rendering");

    group.bench_function("format_timestamp", |b| {
        b.iter(|| format_timestamp(black_box(1_614_834_367_089)))
    });

    for occurrences in [10u64, 1000, 10_000].iter() {
        let summary = SummaryRecord::new(
            EvictionReason::CapacityEvicted,
            "Connection reset by peer".to_string(),
            (0..*occurrences).map(|i| 1_614_834_367_089 + i).collect::<Vec<_>>().into(),
            1,
        );

        group.bench_with_input(
            BenchmarkId::new("format_message", occurrences),
            &summary,
            |b, summary| b.iter(|| black_box(summary.format_message())),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_threaded_throughput,
    bench_concurrent_throughput,
    bench_key_diversity,
    bench_cache_size,
    bench_summary_rendering,
);
criterion_main!(benches);
