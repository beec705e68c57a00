#![cfg(loom)]

//! Usage:
//!   RUSTFLAGS="--cfg loom" cargo test --release --test loom_tests

use chronos::config::TimerConfig;
use chronos::core::DoubleBufferedChannel;
use chronos::defer::{TimedAction, Timer};
use chronos::time::ManualClock;
use loom::thread;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn loom_post_during_drain() {
    loom::model(|| {
        let mut channel = DoubleBufferedChannel::new(4, 0u32);

        let producers: Vec<_> = (1..=2)
            .map(|p| {
                let tx = channel.sender();
                thread::spawn(move || {
                    assert!(tx.post(p));
                })
            })
            .collect();

        let mut seen = vec![];
        channel.drain_and_process(|v| seen.push(v));

        for h in producers {
            h.join().unwrap();
        }
        channel.drain_and_process(|v| seen.push(v));

        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
    });
}

#[test]
fn loom_fifo_across_swaps() {
    loom::model(|| {
        let mut channel = DoubleBufferedChannel::new(2, 0u32);
        let tx = channel.sender();

        let producer = thread::spawn(move || {
            assert!(tx.post(1));
            assert!(tx.post(2));
        });

        let mut seen = vec![];
        channel.drain_and_process(|v| seen.push(v));
        producer.join().unwrap();
        channel.drain_and_process(|v| seen.push(v));

        assert_eq!(seen, vec![1, 2]);
    });
}

#[test]
fn loom_full_buffer_counts_drop() {
    loom::model(|| {
        let channel = DoubleBufferedChannel::new(1, 0u32);

        let handles: Vec<_> = (1..=2)
            .map(|p| {
                let tx = channel.sender();
                thread::spawn(move || tx.post(p))
            })
            .collect();

        let posted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(posted, 1);
        assert_eq!(channel.dropped(), 1);
        assert_eq!(channel.pending(), 1);
    });
}

#[test]
fn loom_register_while_ticking() {
    loom::model(|| {
        let clock = Arc::new(ManualClock::new(0));
        let mut timer = Timer::new(TimerConfig::new(2, 2), clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));

        let handle = timer.handle();
        let f = Arc::clone(&fired);
        let producer = thread::spawn(move || {
            let action = TimedAction::new(1, move || {
                f.fetch_add(1, Ordering::SeqCst);
                false
            });
            handle.register_singular(&action)
        });

        timer.tick();
        let id = producer.join().unwrap();
        clock.advance(2);
        timer.tick();

        assert_eq!(id, 1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timer.active_singular(), 0);
    });
}
