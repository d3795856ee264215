use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use futures::future::try_join_all;
use std::{sync::Arc, time::Instant};
use tally::{GeneratorConfig, MemoryCounterStore, SequenceGenerator};
use tokio::runtime::Builder;

// Number of IDs allocated per benchmark iteration (split across tasks for the
// contended variant).
const TOTAL_IDS: usize = 4096;

/// Benchmarks the fast path: the counter already exists, so every allocation
/// is a single increment.
fn bench_fast_path(c: &mut Criterion) {
    let rt = Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("memory/fast_path");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let generator = SequenceGenerator::new(MemoryCounterStore::new());
            let config = GeneratorConfig::builder("orders").build().unwrap();
            generator.next_id(&config).await.unwrap();

            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..TOTAL_IDS {
                    black_box(generator.next_id(&config).await.unwrap());
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks the slow path: every allocation targets a fresh key and has to
/// create its counter.
fn bench_slow_path(c: &mut Criterion) {
    let rt = Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("memory/slow_path");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    let configs: Vec<_> = (0..TOTAL_IDS)
        .map(|i| GeneratorConfig::builder(format!("key-{i}")).build().unwrap())
        .collect();

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.to_async(&rt).iter_custom(|iters| {
            let configs = &configs;
            async move {
                let start = Instant::now();
                for _ in 0..iters {
                    let generator = SequenceGenerator::new(MemoryCounterStore::new());
                    for config in configs {
                        black_box(generator.next_id(config).await.unwrap());
                    }
                }
                start.elapsed()
            }
        });
    });

    group.finish();
}

/// Benchmarks many tasks allocating from one counter at once.
fn bench_contended(c: &mut Criterion) {
    let workers = num_cpus::get();
    let rt = Builder::new_multi_thread()
        .worker_threads(workers)
        .build()
        .unwrap();
    let mut group = c.benchmark_group("memory/contended");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("tasks/{workers}/elems/{TOTAL_IDS}"), |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let generator = Arc::new(SequenceGenerator::new(MemoryCounterStore::new()));
            let config = Arc::new(GeneratorConfig::builder("orders").build().unwrap());
            let per_task = TOTAL_IDS / workers;

            let start = Instant::now();
            for _ in 0..iters {
                let tasks = (0..workers).map(|_| {
                    let generator = Arc::clone(&generator);
                    let config = Arc::clone(&config);
                    tokio::spawn(async move {
                        for _ in 0..per_task {
                            black_box(generator.next_id(&config).await?);
                        }
                        Ok::<_, tally::Error>(())
                    })
                });
                for result in try_join_all(tasks).await.unwrap() {
                    result.unwrap();
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fast_path, bench_slow_path, bench_contended);
criterion_main!(benches);
