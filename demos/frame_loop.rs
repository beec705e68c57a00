//! Frame Loop - simulasi game loop di atas DeferContext
//!
//! Skenario:
//! 1. Thread input post event (mouse move digabung, key press tidak)
//! 2. Thread worker post message dan deferred call
//! 3. Thread utama menjalankan `pump` sekali per frame, dengan timer
//!    singular (spawn) dan repeated (heartbeat) yang fire di dalamnya
//!
//! Usage:
//!   cargo run --release --example frame_loop -- [options]
//!
//! Options:
//!   --frames <N>     Jumlah frame (default: 300)
//!   --fps <N>        Target frame per detik (default: 60)

use chronos::config::DeferConfig;
use chronos::defer::{DeferredCall, Message, MessageHandler, SenderId, TimedAction};
use chronos::event::Event;
use chronos::time::millis_to_raw;
use chronos::DeferContext;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const MSG_SCORE: u32 = 1;
const MSG_LOG: u32 = 2;
const WORKER: SenderId = SenderId(7);

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Key(char),
    MouseMove { dx: i32, dy: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum InputKind {
    Key,
    MouseMove,
}

impl Event for Input {
    type Kind = InputKind;

    fn kind(&self) -> InputKind {
        match self {
            Input::Key(_) => InputKind::Key,
            Input::MouseMove { .. } => InputKind::MouseMove,
        }
    }

    fn can_combine(&self) -> bool {
        matches!(self, Input::MouseMove { .. })
    }

    fn combine(&mut self, newer: &Self) {
        if let (Input::MouseMove { dx, dy }, Input::MouseMove { dx: nx, dy: ny }) = (self, newer) {
            *dx += nx;
            *dy += ny;
        }
    }
}

/// Frame Loop Configuration
struct FrameConfig {
    frames: u32,
    fps: u32,
    verbose: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            frames: 300,
            fps: 60,
            verbose: false,
        }
    }
}

/// Statistik waktu `pump` per frame
struct PumpLatency {
    samples: Vec<u64>,
    max_ns: u64,
    total_ns: u64,
}

impl PumpLatency {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            max_ns: 0,
            total_ns: 0,
        }
    }

    fn record(&mut self, ns: u64) {
        self.samples.push(ns);
        self.max_ns = self.max_ns.max(ns);
        self.total_ns += ns;
    }

    fn percentile(&self, p: f64) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64 * p / 100.0) as usize).min(sorted.len() - 1);
        sorted[idx]
    }

    fn print_report(&self) {
        if self.samples.is_empty() {
            println!("  No samples collected");
            return;
        }

        let avg_ns = self.total_ns / self.samples.len() as u64;
        println!("  Frames:     {}", self.samples.len());
        println!("  Avg:        {:.2} μs", avg_ns as f64 / 1000.0);
        println!("  P50:        {:.2} μs", self.percentile(50.0) as f64 / 1000.0);
        println!("  P99:        {:.2} μs", self.percentile(99.0) as f64 / 1000.0);
        println!("  Max:        {:.2} μs", self.max_ns as f64 / 1000.0);
    }
}

fn run_frame_loop(config: &FrameConfig) -> chronos::Result<()> {
    println!("🎮 CHRONOS FRAME LOOP - Deferred Actuation Demo");
    println!("===============================================\n");
    println!("Configuration:");
    println!("  Frames:     {}", config.frames);
    println!("  FPS:        {}\n", config.fps);

    let mut ctx: DeferContext<Input> = DeferContext::new(DeferConfig::default())?;
    let handles = ctx.handles();
    let running = Arc::new(AtomicBool::new(true));

    // Handler message dari worker
    let score = Arc::new(AtomicU64::new(0));
    let s = Arc::clone(&score);
    let score_handler = MessageHandler::from_sender(WORKER, move |data| {
        let mut points = [0u8; 8];
        points.copy_from_slice(&data[..8]);
        s.fetch_add(u64::from_le_bytes(points), Ordering::Relaxed);
    });
    let log_handler = MessageHandler::new(|data| {
        let text = String::from_utf8_lossy(data);
        tracing::info!(text = %text.trim_end_matches('\0'), "Worker log");
    });
    handles.messages.register_handler(MSG_SCORE, &score_handler);
    handles.messages.register_handler(MSG_LOG, &log_handler);

    // Heartbeat tiap 100ms, berhenti sendiri setelah 20 kali
    let beats = Arc::new(AtomicU64::new(0));
    let b = Arc::clone(&beats);
    let heartbeat = TimedAction::named("heartbeat", millis_to_raw(100), move || {
        b.fetch_add(1, Ordering::Relaxed) + 1 < 20
    });
    handles.timer.register_repeated(&heartbeat);

    // Spawn sekali setelah 500ms
    let spawned = Arc::new(AtomicBool::new(false));
    let sp = Arc::clone(&spawned);
    let spawn = TimedAction::named("spawn", millis_to_raw(500), move || {
        sp.store(true, Ordering::Relaxed);
        false
    });
    handles.timer.register_singular(&spawn);

    // Thread input
    let input = {
        let events = handles.events.clone();
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut posted = 0u64;
            let mut i = 0u32;
            while running.load(Ordering::Relaxed) {
                let event = if i % 10 == 0 {
                    Input::Key(char::from(b'a' + (i / 10 % 26) as u8))
                } else {
                    Input::MouseMove { dx: 1, dy: -1 }
                };
                posted += events.post_event(event) as u64;
                i = i.wrapping_add(1);
                thread::sleep(Duration::from_micros(500));
            }
            posted
        })
    };

    // Thread worker
    let worker = {
        let handles = handles.clone();
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut round = 0u64;
            while running.load(Ordering::Relaxed) {
                let score = Message::new(MSG_SCORE)
                    .with_sender(WORKER)
                    .with_data(&(round % 5 + 1).to_le_bytes());
                handles.messages.post_message(score);

                if round % 50 == 0 {
                    let log = Message::new(MSG_LOG).with_data(format!("round {}", round).as_bytes());
                    handles.messages.post_message(log);
                    handles.deferred.post_call(DeferredCall::new(move || {
                        tracing::debug!(round, "Deferred checkpoint");
                    }));
                }
                round += 1;
                thread::sleep(Duration::from_millis(2));
            }
            round
        })
    };

    let frame_time = Duration::from_nanos(1_000_000_000 / config.fps.max(1) as u64);
    let mut latency = PumpLatency::new(config.frames as usize);
    let mut key_presses = 0u64;
    let mut mouse = (0i64, 0i64);
    let mut totals = [0usize; 4];

    println!("🚀 Running {} frames...\n", config.frames);
    let start = Instant::now();
    for frame in 0..config.frames {
        let frame_start = Instant::now();

        let mut dispatcher = |event: &Input| {
            match event {
                Input::Key(_) => key_presses += 1,
                Input::MouseMove { dx, dy } => {
                    mouse.0 += *dx as i64;
                    mouse.1 += *dy as i64;
                }
            }
            true
        };
        let stats = ctx.pump(&mut dispatcher);
        latency.record(frame_start.elapsed().as_nanos() as u64);

        totals[0] += stats.calls;
        totals[1] += stats.messages;
        totals[2] += stats.events;
        totals[3] += stats.fired;

        if config.verbose && stats.fired > 0 {
            println!("  [frame {:>4}] fired {} action(s)", frame, stats.fired);
        }

        if let Some(rest) = frame_time.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }
    let duration = start.elapsed();

    running.store(false, Ordering::Relaxed);
    let events_posted = input.join().unwrap_or(0);
    let rounds = worker.join().unwrap_or(0);
    ctx.shutdown();

    println!("📊 FRAME LOOP RESULTS");
    println!("=====================\n");
    println!("Processed:");
    println!("  Deferred calls: {}", totals[0]);
    println!("  Messages:       {}", totals[1]);
    println!("  Events:         {} (posted {})", totals[2], events_posted);
    println!("  Timer fires:    {}", totals[3]);
    println!("  Worker rounds:  {}", rounds);
    println!("  Key presses:    {}", key_presses);
    println!("  Mouse delta:    ({}, {})", mouse.0, mouse.1);
    println!("  Score:          {}", score.load(Ordering::Relaxed));
    println!("  Heartbeats:     {}", beats.load(Ordering::Relaxed));
    println!("  Spawned:        {}", spawned.load(Ordering::Relaxed));
    println!("  Duration:       {:.2}s\n", duration.as_secs_f64());

    println!("Pump Latency:");
    latency.print_report();
    Ok(())
}

/// Parse command line arguments
fn parse_args() -> FrameConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = FrameConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" | "-f" => {
                if i + 1 < args.len() {
                    config.frames = args[i + 1].parse().unwrap_or(300);
                    i += 1;
                }
            }
            "--fps" => {
                if i + 1 < args.len() {
                    config.fps = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--help" | "-h" => {
                println!("Chronos Frame Loop - Deferred Actuation Demo\n");
                println!("Usage: frame_loop [OPTIONS]\n");
                println!("Options:");
                println!("  -f, --frames <N>   Number of frames (default: 300)");
                println!("      --fps <N>      Target frames per second (default: 60)");
                println!("  -v, --verbose      Show per-frame timer activity");
                println!("  -h, --help         Show this help message");
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();

    let filter = if config.verbose { "chronos=debug,frame_loop=debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if let Err(e) = run_frame_loop(&config) {
        eprintln!("❌ Frame loop failed: {}", e);
        std::process::exit(1);
    }
}
