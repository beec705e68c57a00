//! Timer: scheduler singular/repeated berbasis tick
//!
//! Arsitektur:
//! ```text
//! producer threads                      tick thread
//! ----------------                      -----------
//! TimerHandle::register_*  --> [singular input]  --+
//!                          --> [repeated input]  --+--> consume --> active rings
//! TimerHandle::unregister_* -> [control channel] --+--> process --> free node
//!                                                        fire scans
//! ```
//!
//! Active ring dan node store hanya dimutasi oleh thread yang memanggil
//! `tick`. Thread lain hanya pernah menyentuh channel.

use super::action::{ActionRef, ActionSlot, TimedAction};
use crate::config::TimerConfig;
use crate::core::sync::SpinLock;
use crate::core::{ChannelSender, DoubleBufferedChannel, IntrusiveNodeStore, RingId};
use crate::error::Result;
use crate::time::{Clock, RawTime};
use std::sync::Arc;

/// Control message internal Timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TimerMessage {
    /// Null sentinel control channel
    #[default]
    NoMessage,
    RemoveSingular(u64),
    RemoveRepeated(u64),
}

/// Jenis jadwal action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Fire sekali lalu dilepas
    Singular,
    /// Fire berulang sampai `fire` return `false`
    Repeated,
}

/// Sisi producer Timer, bisa di-clone ke thread mana pun
#[derive(Clone)]
pub struct TimerHandle {
    clock: Arc<dyn Clock>,
    // Lock registrasi: id berikutnya + urutan post
    next_id: Arc<SpinLock<u64>>,
    singular: ChannelSender<ActionSlot>,
    repeated: ChannelSender<ActionSlot>,
    control: ChannelSender<TimerMessage>,
}

impl TimerHandle {
    /// Register action sekali jalan
    ///
    /// Returns action id (non-zero), atau 0 jika input queue penuh.
    #[inline]
    pub fn register_singular(&self, action: &ActionRef) -> u64 {
        self.register(action, ActionKind::Singular)
    }

    /// Register action berulang
    ///
    /// Returns action id (non-zero), atau 0 jika input queue penuh.
    #[inline]
    pub fn register_repeated(&self, action: &ActionRef) -> u64 {
        self.register(action, ActionKind::Repeated)
    }

    /// Stamp `now + interval`, ambil id berikutnya, post ke input channel
    pub fn register(&self, action: &ActionRef, kind: ActionKind) -> u64 {
        action.set_next_fire_time_from(self.clock.now());

        let mut next_id = self.next_id.lock();
        // Id tetap terpakai walaupun post gagal
        *next_id += 1;
        let id = *next_id;
        action.set_action_id(id);

        let input = match kind {
            ActionKind::Singular => &self.singular,
            ActionKind::Repeated => &self.repeated,
        };
        if input.post(ActionSlot(Some(Arc::clone(action)))) {
            return id;
        }
        drop(next_id);

        if cfg!(debug_assertions) {
            tracing::warn!(?kind, id, "Failed to register action, queue full");
        }
        0
    }

    /// Minta action singular dihapus pada tick berikutnya
    ///
    /// Returns `true` jika request berhasil di-post.
    #[inline]
    pub fn unregister_singular(&self, action_id: u64) -> bool {
        self.unregister(TimerMessage::RemoveSingular(action_id))
    }

    /// Minta action repeated dihapus pada tick berikutnya
    #[inline]
    pub fn unregister_repeated(&self, action_id: u64) -> bool {
        self.unregister(TimerMessage::RemoveRepeated(action_id))
    }

    fn unregister(&self, message: TimerMessage) -> bool {
        let posted = {
            let _order = self.next_id.lock();
            self.control.post(message)
        };
        if !posted && cfg!(debug_assertions) {
            tracing::warn!(?message, "Failed to unregister action, queue full");
        }
        posted
    }

    /// Resume action yang di-pause, jadwal baru dihitung dari sekarang
    pub fn resume(&self, action: &TimedAction) {
        action.resume(self.clock.now());
    }

    /// Waktu saat ini menurut clock Timer
    #[inline]
    pub fn now(&self) -> RawTime {
        self.clock.now()
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("last_id", &*self.next_id.lock())
            .finish_non_exhaustive()
    }
}

/// Timer: pemilik active ring, dijalankan oleh satu thread tick
pub struct Timer {
    handle: TimerHandle,
    singular_input: DoubleBufferedChannel<ActionSlot>,
    repeated_input: DoubleBufferedChannel<ActionSlot>,
    control: DoubleBufferedChannel<TimerMessage>,
    store: IntrusiveNodeStore<ActionRef>,
    singular: RingId,
    repeated: RingId,
}

impl Timer {
    /// Membuat Timer baru
    ///
    /// # Panics
    /// Panic jika salah satu ukuran di `config` nol, lihat [`Timer::try_new`]
    pub fn new(config: TimerConfig, clock: Arc<dyn Clock>) -> Self {
        let singular_input = DoubleBufferedChannel::new(config.queue_size, ActionSlot(None));
        let repeated_input = DoubleBufferedChannel::new(config.queue_size, ActionSlot(None));
        let control =
            DoubleBufferedChannel::new(config.control_capacity(), TimerMessage::NoMessage);

        let mut store = IntrusiveNodeStore::new(config.average_num_actions, config.max_blocks);
        let singular = store.create_ring();
        let repeated = store.create_ring();

        let handle = TimerHandle {
            clock,
            next_id: Arc::new(SpinLock::new(0)),
            singular: singular_input.sender(),
            repeated: repeated_input.sender(),
            control: control.sender(),
        };

        Self {
            handle,
            singular_input,
            repeated_input,
            control,
            store,
            singular,
            repeated,
        }
    }

    /// Seperti [`Timer::new`] tapi memvalidasi konfigurasi dulu
    ///
    /// # Errors
    /// [`ConfigError`](crate::error::ConfigError) jika ada ukuran nol.
    pub fn try_new(config: TimerConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, clock))
    }

    /// Handle producer untuk thread lain
    #[inline]
    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    #[inline]
    pub fn register_singular(&self, action: &ActionRef) -> u64 {
        self.handle.register_singular(action)
    }

    #[inline]
    pub fn register_repeated(&self, action: &ActionRef) -> u64 {
        self.handle.register_repeated(action)
    }

    #[inline]
    pub fn unregister_singular(&self, action_id: u64) -> bool {
        self.handle.unregister_singular(action_id)
    }

    #[inline]
    pub fn unregister_repeated(&self, action_id: u64) -> bool {
        self.handle.unregister_repeated(action_id)
    }

    /// Pindahkan semua action dari input channel ke active ring
    ///
    /// Returns jumlah action yang terpasang.
    pub fn consume_input_queues(&mut self) -> usize {
        let store = &mut self.store;
        let mut installed = 0;

        let ring = self.singular;
        self.singular_input.drain_and_process(|slot| {
            installed += install(store, ring, slot) as usize;
        });

        let ring = self.repeated;
        self.repeated_input.drain_and_process(|slot| {
            installed += install(store, ring, slot) as usize;
        });

        installed
    }

    /// Jalankan semua remove request di control channel
    ///
    /// Request untuk id yang tidak ada di active ring adalah no-op.
    pub fn process_messages(&mut self) -> usize {
        let store = &mut self.store;
        let (singular, repeated) = (self.singular, self.repeated);

        self.control.drain_and_process(|message| match message {
            TimerMessage::RemoveSingular(id) => {
                find_and_remove(store, singular, id);
            }
            TimerMessage::RemoveRepeated(id) => {
                find_and_remove(store, repeated, id);
            }
            TimerMessage::NoMessage => {
                tracing::warn!("Unrecognized timer message");
            }
        })
    }

    /// Satu siklus scheduler: consume, process, lalu fire scan
    ///
    /// Returns jumlah action yang fire di tick ini.
    pub fn tick(&mut self) -> usize {
        self.consume_input_queues();
        self.process_messages();
        self.fire_singular() + self.fire_repeated()
    }

    fn fire_singular(&mut self) -> usize {
        let now = self.handle.clock.now();
        let mut fired = 0;

        let mut cursor = self.store.head(self.singular);
        while let Some(id) = cursor {
            cursor = self.store.next(id);

            let due = self.store.get(id).is_some_and(|action| action.should_fire(now));
            if !due {
                continue;
            }
            // Node dilepas apapun hasil fire
            if let Some(action) = self.store.free(id) {
                action.fire();
                action.terminate();
                fired += 1;
            }
        }
        fired
    }

    fn fire_repeated(&mut self) -> usize {
        let now = self.handle.clock.now();
        let mut fired = 0;

        let mut cursor = self.store.head(self.repeated);
        while let Some(id) = cursor {
            cursor = self.store.next(id);

            let Some(action) = self.store.get(id) else {
                continue;
            };
            if !action.should_fire(now) {
                continue;
            }

            fired += 1;
            if action.fire() {
                action.set_next_fire_time();
            } else if let Some(action) = self.store.free(id) {
                action.terminate();
            }
        }
        fired
    }

    /// Teardown: buang input dan control yang pending, lepas semua action aktif
    pub fn clear(&mut self) {
        self.singular_input.clear();
        self.repeated_input.clear();
        self.control.clear();

        for ring in [self.singular, self.repeated] {
            for (_, action) in self.store.iter(ring) {
                action.remove();
            }
        }
        self.store.reset();
    }

    /// Jumlah action di active ring singular
    pub fn active_singular(&self) -> usize {
        self.store.ring_len(self.singular)
    }

    /// Jumlah action di active ring repeated
    pub fn active_repeated(&self) -> usize {
        self.store.ring_len(self.repeated)
    }

    /// Action singular aktif, urutan insert
    pub fn singular_actions(&self) -> impl Iterator<Item = &ActionRef> + '_ {
        self.store.iter(self.singular).map(|(_, action)| action)
    }

    /// Action repeated aktif, urutan insert
    pub fn repeated_actions(&self) -> impl Iterator<Item = &ActionRef> + '_ {
        self.store.iter(self.repeated).map(|(_, action)| action)
    }

    /// Action singular yang belum di-consume
    pub fn pending_singular(&self) -> usize {
        self.singular_input.pending()
    }

    pub fn pending_repeated(&self) -> usize {
        self.repeated_input.pending()
    }

    /// Control message yang belum diproses
    pub fn pending_messages(&self) -> usize {
        self.control.pending()
    }

    /// Kapasitas control channel
    pub fn control_capacity(&self) -> usize {
        self.control.capacity()
    }

    pub fn input_capacity(&self) -> usize {
        self.singular_input.capacity()
    }

    pub fn node_store(&self) -> &IntrusiveNodeStore<ActionRef> {
        &self.store
    }

    #[inline]
    pub fn now(&self) -> RawTime {
        self.handle.now()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("active_singular", &self.active_singular())
            .field("active_repeated", &self.active_repeated())
            .field("nodes_in_use", &self.store.num_in_use())
            .finish_non_exhaustive()
    }
}

/// Pasang action ke active ring dan jalankan hook inisialisasi
fn install(store: &mut IntrusiveNodeStore<ActionRef>, ring: RingId, slot: ActionSlot) -> bool {
    let Some(action) = slot.0 else {
        return false;
    };

    match store.allocate(ring, Arc::clone(&action)) {
        Some(_) => {
            action.initialize();
            true
        }
        None => {
            if cfg!(debug_assertions) {
                tracing::warn!(
                    id = action.action_id(),
                    "Node store exhausted, dropping timed action"
                );
            }
            false
        }
    }
}

fn find_and_remove(store: &mut IntrusiveNodeStore<ActionRef>, ring: RingId, action_id: u64) {
    let found = store
        .iter(ring)
        .find(|(_, action)| action.action_id() == action_id)
        .map(|(node, _)| node);

    if let Some(action) = found.and_then(|node| store.free(node)) {
        action.remove();
        tracing::trace!(id = action_id, "Timed action removed");
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::defer::action::ActionState;
    use crate::time::{millis_to_raw, ManualClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn timer(queue_size: usize) -> (Timer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (Timer::new(TimerConfig::new(queue_size, 32), clock.clone()), clock)
    }

    fn counting(name: &str, interval_ms: u64, repeats: usize) -> (ActionRef, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let action = TimedAction::named(name, millis_to_raw(interval_ms), move || {
            c.fetch_add(1, Ordering::SeqCst) + 1 < repeats
        });
        (action, count)
    }

    #[test]
    fn test_new_timer_sizes() {
        let (t, _) = timer(10);
        assert_eq!(t.input_capacity(), 10);
        assert_eq!(t.control_capacity(), 68);
        assert_eq!(t.active_singular(), 0);
        assert_eq!(t.active_repeated(), 0);
        assert_eq!(t.pending_messages(), 0);
    }

    #[test]
    fn test_register_assigns_increasing_ids() {
        let (t, _) = timer(10);
        let ids: Vec<u64> = (0..4)
            .map(|i| {
                let (a, _) = counting("S", 16, 1);
                if i % 2 == 0 {
                    t.register_singular(&a)
                } else {
                    t.register_repeated(&a)
                }
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(t.pending_singular(), 2);
        assert_eq!(t.pending_repeated(), 2);
    }

    #[test]
    fn test_register_full_queue_returns_zero() {
        let (t, _) = timer(2);
        let (a, _) = counting("S1", 16, 1);
        assert_eq!(t.register_singular(&a), 1);
        assert_eq!(t.register_singular(&a), 2);
        assert_eq!(t.register_singular(&a), 0);
        // Id yang gagal tetap terpakai
        let (b, _) = counting("R1", 16, 1);
        assert_eq!(t.register_repeated(&b), 4);
    }

    #[test]
    fn test_consume_moves_to_active_ring() {
        let (mut t, _) = timer(10);
        let (s, _) = counting("S1", 16, 1);
        let (r, _) = counting("R1", 16, 1);
        t.register_singular(&s);
        t.register_repeated(&r);
        assert_eq!(s.state(), ActionState::Waiting);

        assert_eq!(t.consume_input_queues(), 2);
        assert_eq!(t.pending_singular(), 0);
        assert_eq!(t.active_singular(), 1);
        assert_eq!(t.active_repeated(), 1);
        assert_eq!(s.state(), ActionState::Active);
        // caller + active ring
        assert_eq!(TimedAction::retain_count(&s), 2);

        assert_eq!(t.consume_input_queues(), 0);
        assert_eq!(t.active_singular(), 1);
    }

    #[test]
    fn test_unregister_wrong_kind_is_noop() {
        let (mut t, _) = timer(10);
        let (s, _) = counting("S1", 16, 1);
        let (r, _) = counting("R1", 16, 1);
        let a1 = t.register_singular(&s);
        let a2 = t.register_repeated(&r);
        t.consume_input_queues();

        assert!(t.unregister_singular(a2));
        assert!(t.unregister_repeated(a1));
        assert_eq!(t.pending_messages(), 2);
        assert_eq!(t.process_messages(), 2);
        assert_eq!(t.active_singular(), 1);
        assert_eq!(t.active_repeated(), 1);

        t.unregister_singular(a1);
        t.process_messages();
        assert_eq!(t.active_singular(), 0);
        assert!(s.was_removed());
        assert_eq!(TimedAction::retain_count(&s), 1);
        assert_eq!(t.repeated_actions().next().map(|a| a.action_id()), Some(a2));
    }

    #[test]
    fn test_singular_fires_once() {
        let (mut t, clock) = timer(10);
        let (s, count) = counting("S1", 16, 1);
        t.register_singular(&s);

        assert_eq!(t.tick(), 0);
        clock.advance_millis(16);
        // Strict: tepat di next fire time belum fire
        assert_eq!(t.tick(), 0);
        clock.advance_millis(1);
        assert_eq!(t.tick(), 1);
        assert_eq!(t.tick(), 0);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(s.state(), ActionState::Terminated);
        assert_eq!(t.active_singular(), 0);
    }

    #[test]
    fn test_paused_action_is_skipped() {
        let (mut t, clock) = timer(10);
        let (r, count) = counting("R1", 10, usize::MAX);
        t.register_repeated(&r);
        t.tick();

        r.pause();
        clock.advance_millis(100);
        assert_eq!(t.tick(), 0);
        assert_eq!(t.active_repeated(), 1);

        t.handle().resume(&r);
        assert_eq!(r.next_fire_time(), clock.now() + millis_to_raw(10));
        clock.advance_millis(11);
        assert_eq!(t.tick(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_releases_everything() {
        let (mut t, _) = timer(10);
        let (s, _) = counting("S1", 16, 1);
        let (r, _) = counting("R1", 16, 1);
        let (p, _) = counting("P1", 16, 1);
        t.register_singular(&s);
        t.register_repeated(&r);
        t.tick();
        t.register_singular(&p);
        t.unregister_repeated(99);

        t.clear();

        assert_eq!(t.active_singular(), 0);
        assert_eq!(t.active_repeated(), 0);
        assert_eq!(t.pending_singular(), 0);
        assert_eq!(t.pending_messages(), 0);
        assert!(s.was_removed());
        assert!(r.was_removed());
        for action in [&s, &r, &p] {
            assert_eq!(TimedAction::retain_count(action), 1);
        }
        assert_eq!(t.node_store().num_free(), t.node_store().capacity());
    }

    #[test]
    fn test_try_new_rejects_zero_sizes() {
        let clock = Arc::new(ManualClock::new(0));
        assert!(Timer::try_new(TimerConfig::new(0, 32), clock.clone()).is_err());
        assert!(Timer::try_new(TimerConfig::new(8, 0), clock.clone()).is_err());
        assert!(Timer::try_new(TimerConfig::default(), clock).is_ok());
    }

    #[test]
    fn test_handle_registers_from_other_thread() {
        let (mut t, clock) = timer(64);
        let handle = t.handle();
        let counts: Vec<_> = std::thread::spawn(move || {
            (0..8)
                .map(|i| {
                    let (a, c) = counting("T", 1, 1);
                    assert_eq!(handle.register_singular(&a), i + 1);
                    c
                })
                .collect()
        })
        .join()
        .unwrap();

        t.tick();
        clock.advance_millis(2);
        assert_eq!(t.tick(), 8);
        assert!(counts.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }
}
