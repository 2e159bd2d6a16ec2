//! Benchmarks for the SPSC bounded channel
//!
//! Measures uncontended hand-off throughput and cross-thread transfer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lane_video::BoundedChannel;
use std::thread;

fn bench_put_get_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_put_get");

    for capacity in [4usize, 16, 64].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            capacity,
            |b, &capacity| {
                let (mut tx, mut rx) = BoundedChannel::with_capacity::<u64>(capacity);
                b.iter(|| {
                    tx.try_put(black_box(42)).unwrap();
                    black_box(rx.try_get().unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_cross_thread_transfer(c: &mut Criterion) {
    c.bench_function("spsc_cross_thread_10k", |b| {
        b.iter(|| {
            let (mut tx, mut rx) = BoundedChannel::with_capacity::<u64>(16);

            let producer = thread::spawn(move || {
                for i in 0..10_000u64 {
                    let mut value = i;
                    while let Err(v) = tx.try_put(value) {
                        value = v;
                        thread::yield_now();
                    }
                }
            });

            let mut sum = 0u64;
            let mut received = 0u32;
            while received < 10_000 {
                if let Some(v) = rx.try_get() {
                    sum = sum.wrapping_add(v);
                    received += 1;
                } else {
                    thread::yield_now();
                }
            }

            producer.join().unwrap();
            black_box(sum);
        });
    });
}

criterion_group!(benches, bench_put_get_cycle, bench_cross_thread_transfer);
criterion_main!(benches);
