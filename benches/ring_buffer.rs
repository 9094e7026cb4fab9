//! Benchmarks for the SPSC ring buffer
//!
//! Target: <20ns per push/pop pair uncontended

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use cross_section_engine::core::{MarketUpdate, RingBuffer};

fn bench_push_pop(c: &mut Criterion) {
    let (mut tx, mut rx) = RingBuffer::<MarketUpdate>::with_capacity(4096).unwrap();
    let update = MarketUpdate::new(7, 100.0, 1.0, 99.99, 100.01);

    c.bench_function("ring_push_pop", |b| {
        b.iter(|| {
            tx.push(black_box(update));
            black_box(rx.pop())
        })
    });
}

fn bench_cross_thread(c: &mut Criterion) {
    const BATCH: u64 = 100_000;
    let mut group = c.benchmark_group("ring_cross_thread");
    group.throughput(Throughput::Elements(BATCH));
    group.sample_size(20);

    group.bench_function("transfer_100k", |b| {
        b.iter(|| {
            let (mut tx, mut rx) = RingBuffer::<MarketUpdate>::with_capacity(4096).unwrap();
            std::thread::scope(|s| {
                s.spawn(move || {
                    for i in 0..BATCH {
                        let update = MarketUpdate::new((i % 2048) as u32, i as f32, 1.0, 0.0, 0.0);
                        while !tx.push(update) {
                            std::hint::spin_loop();
                        }
                    }
                });
                let mut received = 0;
                while received < BATCH {
                    if rx.pop().is_some() {
                        received += 1;
                    }
                }
            });
        })
    });
    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_cross_thread);
criterion_main!(benches);
