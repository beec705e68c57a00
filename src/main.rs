//! Chronos benchmark runner
//!
//! Usage:
//!   cargo run --release -- [--iterations N] [--queue-size N] [--verbose]

use chronos::config::TimerConfig;
use chronos::core::{DoubleBufferedChannel, IntrusiveNodeStore};
use chronos::defer::{TimedAction, Timer};
use chronos::time::ManualClock;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

struct BenchConfig {
    iterations: usize,
    queue_size: usize,
    verbose: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000_000,
            queue_size: 4096,
            verbose: false,
        }
    }
}

fn main() {
    let config = parse_args();

    let filter = if config.verbose { "chronos=debug" } else { "chronos=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("⏱️  Chronos Deferred Actuation Core - v{}", env!("CARGO_PKG_VERSION"));
    println!("==========================================\n");

    benchmark_channel(&config);
    benchmark_node_store(&config);
    benchmark_timer(&config);

    println!("\n✅ All benchmarks complete!");
}

fn benchmark_channel(config: &BenchConfig) {
    println!("📊 Double-Buffered Channel (post + drain)");
    println!("-----------------------------------------");

    let iterations = config.iterations;
    let mut channel = DoubleBufferedChannel::new(config.queue_size, 0u64);

    // Warm up
    for i in 1..=1000 {
        channel.post(i);
    }
    channel.drain_and_process(|_| {});

    let mut drained = 0usize;
    let start = Instant::now();
    for i in 0..iterations {
        channel.post(i as u64 + 1);
        if (i + 1) % config.queue_size == 0 {
            drained += channel.drain_and_process(|v| {
                std::hint::black_box(v);
            });
        }
    }
    drained += channel.drain_and_process(|v| {
        std::hint::black_box(v);
    });
    let duration = start.elapsed();

    let ns = duration.as_nanos() as f64 / iterations as f64;
    println!("  Operations:   {}", iterations);
    println!("  Drained:      {}", drained);
    println!("  Post+drain:   {:.2} ns/op", ns);
    println!(
        "  Throughput:   {:.2} M ops/sec\n",
        iterations as f64 / duration.as_secs_f64() / 1_000_000.0
    );
}

fn benchmark_node_store(config: &BenchConfig) {
    println!("📊 Intrusive Node Store (allocate + free)");
    println!("-----------------------------------------");

    let iterations = config.iterations;
    let mut store = IntrusiveNodeStore::with_block_size(256);
    let ring = store.create_ring();

    let start = Instant::now();
    for i in 0..iterations {
        if let Some(id) = store.allocate(ring, i) {
            store.free(id);
        }
    }
    let duration = start.elapsed();

    let ns = duration.as_nanos() as f64 / iterations as f64;
    println!("  Operations:   {}", iterations);
    println!("  Alloc+free:   {:.2} ns/op", ns);
    println!("  Blocks used:  {}", store.num_blocks());
    println!("  Free nodes:   {}\n", store.num_free());
}

fn benchmark_timer(config: &BenchConfig) {
    println!("📊 Timer (register + tick)");
    println!("--------------------------");

    const ACTIONS: usize = 1000;
    let ticks = (config.iterations / ACTIONS).max(1);

    let clock = Arc::new(ManualClock::new(0));
    let mut timer = Timer::new(TimerConfig::new(ACTIONS, ACTIONS), clock.clone());

    let actions: Vec<_> = (0..ACTIONS)
        .map(|i| TimedAction::new(1 + (i % 16) as u64, || true))
        .collect();

    let start = Instant::now();
    for action in &actions {
        timer.register_repeated(action);
    }
    let register_duration = start.elapsed();

    let mut fired = timer.tick();
    let start = Instant::now();
    for _ in 0..ticks {
        clock.advance(1);
        fired += timer.tick();
    }
    let tick_duration = start.elapsed();

    let register_ns = register_duration.as_nanos() as f64 / ACTIONS as f64;
    let tick_us = tick_duration.as_nanos() as f64 / ticks as f64 / 1000.0;

    println!("  Active actions: {}", timer.active_repeated());
    println!("  Register:       {:.2} ns/op", register_ns);
    println!("  Ticks:          {}", ticks);
    println!("  Tick latency:   {:.3} μs/tick", tick_us);
    println!("  Fired:          {}", fired);
    println!(
        "  Fire rate:      {:.2} M fires/sec",
        fired as f64 / tick_duration.as_secs_f64() / 1_000_000.0
    );
}

fn parse_args() -> BenchConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = BenchConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--iterations" | "-n" => {
                if i + 1 < args.len() {
                    config.iterations = args[i + 1].parse().unwrap_or(1_000_000);
                    i += 1;
                }
            }
            "--queue-size" | "-q" => {
                if i + 1 < args.len() {
                    config.queue_size = args[i + 1].parse().unwrap_or(4096).max(1);
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("Chronos - Deferred Actuation Core benchmarks\n");
                println!("Usage: chronos [OPTIONS]\n");
                println!("Options:");
                println!("  -n, --iterations <N>   Operations per benchmark (default: 1000000)");
                println!("  -q, --queue-size <N>   Channel capacity (default: 4096)");
                println!("  -v, --verbose          Debug logging");
                println!("  -h, --help             Show this help");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config.iterations = config.iterations.max(1);
    config
}
