//! Raw time dan Clock
//!
//! Semua jadwal disimpan dalam raw time unit (nanoseconds dari titik
//! monotonic yang tidak ditentukan). Timer tidak membaca jam secara
//! langsung, tapi lewat trait [`Clock`] supaya bisa di-inject di test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Timestamp dalam raw time unit (nanoseconds)
pub type RawTime = u64;

/// Raw unit per detik
pub const RAW_PER_SEC: RawTime = 1_000_000_000;

/// Konversi detik (floating) ke raw unit
#[inline]
pub fn secs_to_raw(secs: f64) -> RawTime {
    (secs * RAW_PER_SEC as f64) as RawTime
}

/// Konversi millisecond ke raw unit
#[inline]
pub const fn millis_to_raw(millis: u64) -> RawTime {
    millis * 1_000_000
}

/// Konversi `Duration` ke raw unit (saturating)
#[inline]
pub fn duration_to_raw(d: Duration) -> RawTime {
    u64::try_from(d.as_nanos()).unwrap_or(RawTime::MAX)
}

/// Konversi raw unit ke `Duration`
#[inline]
pub const fn raw_to_duration(raw: RawTime) -> Duration {
    Duration::from_nanos(raw)
}

/// Sumber waktu untuk Timer
pub trait Clock: Send + Sync {
    /// Waktu saat ini dalam raw unit
    fn now(&self) -> RawTime;
}

/// Monotonic clock dari OS
///
/// Di unix memakai `clock_gettime(CLOCK_MONOTONIC)` langsung,
/// di platform lain `Instant` relatif terhadap waktu pembuatan.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    #[cfg(not(unix))]
    origin: std::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(unix))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[cfg(unix)]
    #[inline(always)]
    fn now(&self) -> RawTime {
        // SAFETY: timespec adalah POD, all-zero valid. CLOCK_MONOTONIC selalu tersedia.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return 0;
        }
        (ts.tv_sec as u64)
            .wrapping_mul(RAW_PER_SEC)
            .wrapping_add(ts.tv_nsec as u64)
    }

    #[cfg(not(unix))]
    #[inline(always)]
    fn now(&self) -> RawTime {
        duration_to_raw(self.origin.elapsed())
    }
}

/// Clock manual untuk test dan simulasi
///
/// Waktu hanya maju saat `advance`/`set` dipanggil.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: RawTime) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Majukan waktu sebesar `delta`
    #[inline]
    pub fn advance(&self, delta: RawTime) {
        self.now.fetch_add(delta, Ordering::AcqRel);
    }

    #[inline]
    pub fn advance_millis(&self, millis: u64) {
        self.advance(millis_to_raw(millis));
    }

    #[inline]
    pub fn set(&self, now: RawTime) {
        self.now.store(now, Ordering::Release);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> RawTime {
        self.now.load(Ordering::Acquire)
    }
}
