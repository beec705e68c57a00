//! Double-Buffered Channel: banyak producer, satu consumer
//!
//! Dua ring queue: satu "incoming" (target producer, dijaga spin-lock)
//! dan satu "draining" (milik consumer). Saat drain, lock hanya dipegang
//! untuk swap isi kedua buffer (O(1)), lalu iterasi berjalan tanpa lock.
//! Producer yang post selama drain selalu masuk ke buffer baru, tidak
//! pernah ke buffer yang sedang di-drain.

use super::ring_queue::FixedSlotRingQueue;
use super::sync::{Arc, AtomicU64, Ordering, SpinLock};
use std::mem;

/// Sisi producer yang dibagi antar thread
struct Shared<T> {
    incoming: SpinLock<FixedSlotRingQueue<T>>,
    // Post yang gagal karena penuh
    dropped: AtomicU64,
}

impl<T: Clone + PartialEq> Shared<T> {
    #[inline]
    fn post(&self, value: T) -> bool {
        let pushed = self.incoming.lock().push(value);
        if !pushed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        pushed
    }

    #[inline]
    fn post_with<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut FixedSlotRingQueue<T>) -> bool,
    {
        let pushed = f(&mut self.incoming.lock());
        if !pushed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        pushed
    }
}

/// Handle producer yang bisa di-clone ke thread lain
pub struct ChannelSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ChannelSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + PartialEq> ChannelSender<T> {
    /// Post nilai ke buffer incoming
    ///
    /// Returns `true` jika berhasil, `false` jika buffer penuh (nilai dibuang).
    #[inline]
    pub fn post(&self, value: T) -> bool {
        self.shared.post(value)
    }

    /// Jalankan `f` atas buffer incoming di bawah lock
    ///
    /// Untuk post yang perlu melihat entry terakhir (coalescing).
    /// `f` harus O(1); return `false` dihitung sebagai drop.
    #[inline]
    pub fn post_with<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut FixedSlotRingQueue<T>) -> bool,
    {
        self.shared.post_with(f)
    }

    /// Jumlah post yang gagal sejak channel dibuat
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for ChannelSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSender").finish_non_exhaustive()
    }
}

/// Double-buffered post/drain channel
///
/// Struct ini adalah sisi consumer: `drain_and_process` butuh `&mut self`,
/// jadi hanya satu thread yang bisa drain. Producer memakai
/// [`ChannelSender`] dari [`DoubleBufferedChannel::sender`].
pub struct DoubleBufferedChannel<T> {
    shared: Arc<Shared<T>>,
    draining: FixedSlotRingQueue<T>,
}

impl<T: Clone + PartialEq> DoubleBufferedChannel<T> {
    /// Membuat channel dengan dua buffer berkapasitas `capacity`.
    ///
    /// # Panics
    /// Panic jika `capacity == 0`
    pub fn new(capacity: usize, null: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                incoming: SpinLock::new(FixedSlotRingQueue::new(capacity, null.clone())),
                dropped: AtomicU64::new(0),
            }),
            draining: FixedSlotRingQueue::new(capacity, null),
        }
    }

    /// Handle producer baru
    pub fn sender(&self) -> ChannelSender<T> {
        ChannelSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Post dari thread consumer sendiri
    #[inline]
    pub fn post(&self, value: T) -> bool {
        self.shared.post(value)
    }

    /// Swap buffer lalu proses setiap entry di buffer yang sekarang privat
    ///
    /// Lock hanya dipegang selama swap. `f` boleh memanggil `post` di
    /// channel yang sama: entry baru masuk ke drain berikutnya.
    /// Returns jumlah entry yang diproses.
    pub fn drain_and_process<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(T),
    {
        self.swap();

        let mut processed = 0;
        while !self.draining.is_empty() {
            f(self.draining.pop());
            processed += 1;
        }
        processed
    }

    /// Swap pointer incoming/draining di bawah lock
    ///
    /// Buffer draining diasumsikan kosong sebelum swap.
    #[inline]
    fn swap(&mut self) {
        let mut incoming = self.shared.incoming.lock();
        mem::swap(&mut *incoming, &mut self.draining);
    }

    /// Jumlah entry yang menunggu di buffer incoming
    pub fn pending(&self) -> usize {
        self.shared.incoming.lock().len()
    }

    /// Buang semua entry di kedua buffer
    pub fn clear(&mut self) {
        self.draining.clear();
        self.shared.incoming.lock().clear();
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.draining.capacity()
    }

    /// Jumlah post yang gagal sejak channel dibuat
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for DoubleBufferedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleBufferedChannel").finish_non_exhaustive()
    }
}
