//! Chronos - Deferred Actuation Core
//!
//! Arsitektur:
//! - Double-Buffered: producer post, satu consumer swap lalu drain tanpa lock
//! - Spin-Lock: lock hanya dipegang untuk push dan swap (O(1))
//! - No-Allocation: ring queue fixed-slot, node store per block
//! - Deferred Removal: mutasi active ring hanya dari thread tick

pub mod config;
pub mod context;
pub mod core;
pub mod defer;
pub mod error;
pub mod event;
pub mod time;

pub use config::DeferConfig;
pub use context::{DeferContext, DeferHandles, PumpStats};
pub use defer::{ActionRef, Fire, TimedAction, Timer, TimerHandle};
pub use error::{ConfigError, Result};
