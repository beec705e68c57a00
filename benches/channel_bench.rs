//! Criterion benchmark untuk channel, node store, dan Timer
//!
//! Run dengan: cargo bench

use chronos::config::TimerConfig;
use chronos::core::{DoubleBufferedChannel, FixedSlotRingQueue, IntrusiveNodeStore};
use chronos::defer::{TimedAction, Timer};
use chronos::time::ManualClock;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

fn bench_post_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel");
    group.throughput(Throughput::Elements(1));

    // Benchmark post (drain saat penuh)
    group.bench_function("post", |b| {
        let mut channel = DoubleBufferedChannel::new(65536, 0u64);
        let mut i = 0u64;
        b.iter(|| {
            if !channel.post(black_box(i)) {
                channel.drain_and_process(|v| {
                    black_box(v);
                });
                channel.post(black_box(i));
            }
            i = i.wrapping_add(1);
        });
    });

    // Benchmark post+drain cycle
    group.bench_function("post_drain_cycle", |b| {
        let mut channel = DoubleBufferedChannel::new(16, 0u64);
        let mut i = 0u64;
        b.iter(|| {
            channel.post(black_box(i));
            channel.drain_and_process(|v| {
                black_box(v);
            });
            i = i.wrapping_add(1);
        });
    });

    // Benchmark ring queue tanpa lock
    group.bench_function("ring_queue_push_pop", |b| {
        let mut queue = FixedSlotRingQueue::new(1024, 0u64);
        let mut i = 0u64;
        b.iter(|| {
            queue.push(black_box(i));
            black_box(queue.pop());
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");

    // Batch post lalu satu drain
    for batch_size in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_function(format!("batch_{}", batch_size), |b| {
            let mut channel = DoubleBufferedChannel::new(16384, 0u64);
            b.iter(|| {
                for i in 0..*batch_size {
                    channel.post(black_box(i as u64));
                }
                channel.drain_and_process(|v| {
                    black_box(v);
                })
            });
        });
    }

    group.finish();
}

fn bench_node_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_store");
    group.throughput(Throughput::Elements(1));

    group.bench_function("allocate_free", |b| {
        let mut store = IntrusiveNodeStore::new(256, 4);
        let ring = store.create_ring();
        let mut i = 0u64;
        b.iter(|| {
            if let Some(id) = store.allocate(ring, black_box(i)) {
                black_box(store.free(id));
            }
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_timer_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer");

    for active in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*active as u64));
        group.bench_function(format!("tick_{}_repeated", active), |b| {
            let clock = Arc::new(ManualClock::new(0));
            let mut timer = Timer::new(TimerConfig::new(*active, *active), clock.clone());
            let actions: Vec<_> = (0..*active)
                .map(|_| TimedAction::new(1, || true))
                .collect();
            for action in &actions {
                timer.register_repeated(action);
            }
            timer.tick();

            // Setiap tick semua action due
            b.iter(|| {
                clock.advance(1);
                black_box(timer.tick())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_post_drain,
    bench_throughput,
    bench_node_store,
    bench_timer_tick
);
criterion_main!(benches);
