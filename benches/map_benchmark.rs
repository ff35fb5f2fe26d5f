//! Benchmark for single-lock and sharded map throughput.
//!
//! Run with: cargo bench --bench map_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sovran_concurrent_map::{AnyConcurrentMap, ConcurrentMap, ShardedConcurrentMap};
use std::sync::Arc;
use std::thread;

const KEYS: u64 = 1_024;
const THREADS: u64 = 4;

fn benchmark_get(c: &mut Criterion) {
    let single = ConcurrentMap::<u64, u64>::new();
    let sharded = ShardedConcurrentMap::<u64, u64>::new();
    let erased = AnyConcurrentMap::of::<u64, u64>();
    for i in 0..KEYS {
        single.put(i, i).unwrap();
        sharded.put(i, i).unwrap();
        erased.put(i, i).unwrap();
    }

    c.bench_function("get_single_lock", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 1) % KEYS;
            black_box(single.get(&i).unwrap())
        });
    });

    c.bench_function("get_sharded", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 1) % KEYS;
            black_box(sharded.get(&i).unwrap())
        });
    });

    c.bench_function("get_runtime_typed", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i = (i + 1) % KEYS;
            black_box(erased.get::<u64, u64>(&i).unwrap())
        });
    });
}

fn benchmark_contended_put(c: &mut Criterion) {
    c.bench_function("put_4_threads_single_lock", |b| {
        let map = Arc::new(ConcurrentMap::<u64, u64>::with_capacity(KEYS as usize));
        b.iter(|| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let map = Arc::clone(&map);
                    thread::spawn(move || {
                        for i in 0..KEYS / THREADS {
                            map.put(t * KEYS + i, i).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    c.bench_function("put_4_threads_sharded", |b| {
        let map = Arc::new(ShardedConcurrentMap::<u64, u64>::new());
        b.iter(|| {
            let handles: Vec<_> = (0..THREADS)
                .map(|t| {
                    let map = Arc::clone(&map);
                    thread::spawn(move || {
                        for i in 0..KEYS / THREADS {
                            map.put(t * KEYS + i, i).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let single = ConcurrentMap::<u64, u64>::new();
    let sharded = ShardedConcurrentMap::<u64, u64>::new();
    for i in 0..KEYS {
        single.put(i, i).unwrap();
        sharded.put(i, i).unwrap();
    }

    c.bench_function("to_map_single_lock", |b| {
        b.iter(|| black_box(single.to_map().unwrap()))
    });
    c.bench_function("to_map_sharded", |b| {
        b.iter(|| black_box(sharded.to_map().unwrap()))
    });
}

criterion_group!(benches, benchmark_get, benchmark_contended_put, benchmark_snapshot);
criterion_main!(benches);
