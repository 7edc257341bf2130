//! Admission overhead of the rate limiter.
//!
//! The rate is set high enough that the interval rounds to zero, so these
//! measure reservation and handle-load cost rather than sleeping.
//!
//! Run with: cargo bench -p ratedrain --bench limiter

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ratedrain::{LimiterHandle, RateLimiter};
use std::sync::Arc;
use std::thread;

const UNPACED: u32 = u32::MAX;
const TAKES_PER_THREAD: u64 = 10_000;

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create runtime")
}

fn bench_take(c: &mut Criterion) {
    let rt = create_runtime();
    let limiter = rt.block_on(async { RateLimiter::new(UNPACED).expect("valid rate") });

    c.bench_function("take_async", |b| {
        b.to_async(&rt).iter(|| async { black_box(limiter.take().await) })
    });
}

fn bench_handle_take(c: &mut Criterion) {
    let rt = create_runtime();
    let handle = rt.block_on(async { LimiterHandle::new(RateLimiter::new(UNPACED).expect("valid rate")) });

    c.bench_function("handle_current_take", |b| {
        b.to_async(&rt).iter(|| async { black_box(handle.current().take().await) })
    });
}

/// Threads hammering one limiter: measures CAS contention.
fn bench_contended_blocking(c: &mut Criterion) {
    let rt = create_runtime();
    let mut group = c.benchmark_group("contended_take_blocking");

    for threads in [1usize, 2, 4, 8] {
        group.throughput(Throughput::Elements(threads as u64 * TAKES_PER_THREAD));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let limiter = Arc::new(rt.block_on(async { RateLimiter::new(UNPACED).expect("valid rate") }));
                let workers: Vec<_> = (0..threads)
                    .map(|_| {
                        let limiter = Arc::clone(&limiter);
                        thread::spawn(move || {
                            for _ in 0..TAKES_PER_THREAD {
                                black_box(limiter.take_blocking());
                            }
                        })
                    })
                    .collect();
                for worker in workers {
                    worker.join().expect("worker panicked");
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_take, bench_handle_take, bench_contended_blocking);
criterion_main!(benches);
