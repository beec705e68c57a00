//! TimedAction: unit kerja yang dijadwalkan oleh Timer
//!
//! State jadwal (id, state, interval, next fire time) disimpan dalam
//! atomic karena dibaca dari thread producer dan thread tick.
//! Behaviour milik user ada di balik trait [`Fire`] dan hanya dipanggil
//! dari thread tick.
//!
//! Ownership: `Arc` bersama. Timer memegang satu strong reference selama
//! action ada di active ring, caller memegang reference-nya sendiri.
//! Action di-destroy saat reference terakhir di-drop.

use crate::core::sync::SpinLock;
use crate::time::RawTime;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Object ID: hash stabil dari nama action
pub type Oid = u32;

/// Shared reference ke action
pub type ActionRef = Arc<TimedAction>;

/// Hash 32-bit stabil untuk nama (Adler-32 variant)
#[inline]
pub fn object_id(name: &str) -> Oid {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for &byte in name.as_bytes() {
        a = (a + byte as u32) % 65521;
        b = (b + a) % 65521;
    }

    (b << 16) | a
}

/// Lifecycle state sebuah action
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    /// Sudah dibuat atau masih di input channel
    Waiting = 0,
    /// Terpasang di active ring
    Active = 1,
    /// Sementara, selama callback fire berjalan
    Executing = 2,
    /// Tidak fire sampai di-resume
    Paused = 3,
    /// Singular sudah fire, atau repeated selesai
    Terminated = 4,
    /// Di-unregister
    Removed = 5,
}

impl ActionState {
    #[inline(always)]
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Active,
            2 => Self::Executing,
            3 => Self::Paused,
            4 => Self::Terminated,
            5 => Self::Removed,
            _ => Self::Waiting,
        }
    }
}

/// Behaviour yang dijalankan saat action fire
pub trait Fire: Send {
    /// Dipanggil saat waktunya tiba.
    ///
    /// Untuk repeated action, return `true` untuk tetap dijadwalkan.
    /// Untuk singular action nilai return diabaikan.
    fn fire(&mut self) -> bool;

    /// Dipanggil sekali saat Timer memasang action ke active ring
    fn on_initialize(&mut self) {}
}

impl<F> Fire for F
where
    F: FnMut() -> bool + Send,
{
    #[inline]
    fn fire(&mut self) -> bool {
        self()
    }
}

/// Satu unit kerja yang bisa dijadwalkan
pub struct TimedAction {
    action_id: AtomicU64,
    oid: Oid,
    name: Option<Box<str>>,
    state: AtomicU8,
    interval: AtomicU64,
    next_fire: AtomicU64,
    behavior: SpinLock<Box<dyn Fire>>,
}

impl TimedAction {
    /// Action tanpa nama
    pub fn new(interval: RawTime, behavior: impl Fire + 'static) -> ActionRef {
        Self::build(0, None, interval, Box::new(behavior))
    }

    /// Action bernama; object id diturunkan dari nama
    pub fn named(name: &str, interval: RawTime, behavior: impl Fire + 'static) -> ActionRef {
        Self::build(object_id(name), Some(name.into()), interval, Box::new(behavior))
    }

    /// Action dengan object id eksplisit
    pub fn with_oid(oid: Oid, interval: RawTime, behavior: impl Fire + 'static) -> ActionRef {
        Self::build(oid, None, interval, Box::new(behavior))
    }

    fn build(
        oid: Oid,
        name: Option<Box<str>>,
        interval: RawTime,
        behavior: Box<dyn Fire>,
    ) -> ActionRef {
        Arc::new(Self {
            action_id: AtomicU64::new(0),
            oid,
            name,
            state: AtomicU8::new(ActionState::Waiting as u8),
            interval: AtomicU64::new(interval),
            next_fire: AtomicU64::new(0),
            behavior: SpinLock::new(behavior),
        })
    }

    /// Action id dari Timer, 0 jika belum pernah di-register
    #[inline(always)]
    pub fn action_id(&self) -> u64 {
        self.action_id.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn set_action_id(&self, id: u64) {
        self.action_id.store(id, Ordering::Release);
    }

    #[inline(always)]
    pub fn object_id(&self) -> Oid {
        self.oid
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline(always)]
    pub fn state(&self) -> ActionState {
        ActionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline(always)]
    pub fn was_removed(&self) -> bool {
        self.state() == ActionState::Removed
    }

    /// Interval tunggu dalam raw unit
    #[inline(always)]
    pub fn interval(&self) -> RawTime {
        self.interval.load(Ordering::Acquire)
    }

    pub fn set_interval(&self, interval: RawTime) {
        self.interval.store(interval, Ordering::Release);
    }

    /// Waktu fire berikutnya (absolut, raw unit)
    #[inline(always)]
    pub fn next_fire_time(&self) -> RawTime {
        self.next_fire.load(Ordering::Acquire)
    }

    /// `next = now + interval`, dipakai saat register dan resume
    #[inline]
    pub fn set_next_fire_time_from(&self, now: RawTime) {
        self.next_fire
            .store(now.wrapping_add(self.interval()), Ordering::Release);
    }

    /// `next = previous next + interval`, dipakai saat repeat supaya tidak drift
    #[inline]
    pub fn set_next_fire_time(&self) {
        let next = self.next_fire_time().wrapping_add(self.interval());
        self.next_fire.store(next, Ordering::Release);
    }

    /// Set waktu fire berikutnya secara eksplisit
    #[inline]
    pub fn set_next_fire_time_at(&self, at: RawTime) {
        self.next_fire.store(at, Ordering::Release);
    }

    /// Cek apakah `now` sudah melewati next fire time
    ///
    /// Action yang di-pause tidak pernah fire.
    #[inline(always)]
    pub fn should_fire(&self, now: RawTime) -> bool {
        self.state() != ActionState::Paused && now > self.next_fire_time()
    }

    pub fn pause(&self) {
        self.state
            .store(ActionState::Paused as u8, Ordering::Release);
    }

    /// Lanjutkan action yang di-pause, jadwal dihitung ulang dari `now`
    pub fn resume(&self, now: RawTime) {
        self.set_next_fire_time_from(now);
        let _ = self.state.compare_exchange(
            ActionState::Paused as u8,
            ActionState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Jumlah strong reference yang masih hidup
    #[inline]
    pub fn retain_count(this: &ActionRef) -> usize {
        Arc::strong_count(this)
    }

    #[inline]
    pub(crate) fn initialize(&self) {
        self.set_state(ActionState::Active);
        self.behavior.lock().on_initialize();
    }

    /// Jalankan behaviour; state Executing selama callback
    pub(crate) fn fire(&self) -> bool {
        self.set_state(ActionState::Executing);
        let keep = self.behavior.lock().fire();
        let _ = self.state.compare_exchange(
            ActionState::Executing as u8,
            ActionState::Active as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        keep
    }

    #[inline]
    pub(crate) fn terminate(&self) {
        self.set_state(ActionState::Terminated);
    }

    #[inline]
    pub(crate) fn remove(&self) {
        self.set_state(ActionState::Removed);
    }

    #[inline(always)]
    fn set_state(&self, state: ActionState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl fmt::Debug for TimedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedAction")
            .field("action_id", &self.action_id())
            .field("oid", &self.oid)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("interval", &self.interval())
            .field("next_fire", &self.next_fire_time())
            .finish_non_exhaustive()
    }
}

/// Slot input channel: null sentinel = `None`, equality by pointer
#[derive(Clone, Default)]
pub(crate) struct ActionSlot(pub(crate) Option<ActionRef>);

impl PartialEq for ActionSlot {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_is_stable() {
        assert_eq!(object_id("S1"), object_id("S1"));
        assert_ne!(object_id("S1"), object_id("S2"));
        // Adler-32 dari string kosong
        assert_eq!(object_id(""), 1);
        // Adler-32 referensi untuk "Wikipedia"
        assert_eq!(object_id("Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn test_new_action_is_waiting() {
        let action = TimedAction::named("S1", 16, || true);
        assert_eq!(action.action_id(), 0);
        assert_eq!(action.state(), ActionState::Waiting);
        assert_eq!(action.name(), Some("S1"));
        assert_eq!(action.object_id(), object_id("S1"));
        assert_eq!(TimedAction::retain_count(&action), 1);
    }

    #[test]
    fn test_next_fire_time_no_drift() {
        let action = TimedAction::new(16, || true);
        action.set_next_fire_time_from(100);
        assert_eq!(action.next_fire_time(), 116);

        for _ in 0..10 {
            action.set_next_fire_time();
        }
        assert_eq!(action.next_fire_time(), 116 + 10 * 16);
    }

    #[test]
    fn test_explicit_oid_and_schedule() {
        let action = TimedAction::with_oid(0xBEEF, 10, || true);
        assert_eq!(action.object_id(), 0xBEEF);
        assert_eq!(action.name(), None);

        action.set_next_fire_time_at(500);
        assert_eq!(action.next_fire_time(), 500);

        action.set_interval(25);
        assert_eq!(action.interval(), 25);
        action.set_next_fire_time();
        assert_eq!(action.next_fire_time(), 525);
        action.set_next_fire_time_from(1_000);
        assert_eq!(action.next_fire_time(), 1_025);
    }

    #[test]
    fn test_should_fire_is_strict() {
        let action = TimedAction::new(10, || true);
        action.set_next_fire_time_from(0);
        assert!(!action.should_fire(9));
        assert!(!action.should_fire(10));
        assert!(action.should_fire(11));
    }

    #[test]
    fn test_pause_and_resume() {
        let action = TimedAction::new(10, || true);
        action.initialize();
        action.set_next_fire_time_from(0);

        action.pause();
        assert_eq!(action.state(), ActionState::Paused);
        assert!(!action.should_fire(1_000));

        action.resume(1_000);
        assert_eq!(action.state(), ActionState::Active);
        assert_eq!(action.next_fire_time(), 1_010);
        assert!(action.should_fire(1_011));
    }

    #[test]
    fn test_fire_returns_behavior_result() {
        let mut left = 2;
        let action = TimedAction::new(1, move || {
            left -= 1;
            left > 0
        });
        action.initialize();
        assert!(action.fire());
        assert_eq!(action.state(), ActionState::Active);
        assert!(!action.fire());
    }

    #[test]
    fn test_slot_equality_by_pointer() {
        let a = TimedAction::new(1, || true);
        let b = TimedAction::new(1, || true);
        assert!(ActionSlot(Some(a.clone())) == ActionSlot(Some(a.clone())));
        assert!(ActionSlot(Some(a)) != ActionSlot(Some(b)));
        assert!(ActionSlot(None) == ActionSlot::default());
    }
}
