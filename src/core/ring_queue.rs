//! Fixed-Slot Ring Queue dengan null sentinel
//!
//! Circular buffer berkapasitas tetap. Tidak ada field count: slot kosong
//! ditandai dengan nilai "null" yang dipilih caller saat konstruksi, jadi
//! `is_empty`/`is_full` cukup melihat slot di cursor baca/tulis.
//! Tidak ada alokasi setelah inisialisasi.

use std::mem;

/// Fixed-capacity ring queue
///
/// Setiap nilai yang di-push HARUS berbeda dari null sentinel,
/// kalau tidak nilai itu tidak terlihat oleh `pop`.
#[derive(Debug, Clone)]
pub struct FixedSlotRingQueue<T> {
    // Pre-allocated slots, semua diisi null saat init
    slots: Box<[T]>,
    null: T,
    // Cursor baca
    start: usize,
    // Cursor tulis
    end: usize,
}

impl<T: Clone + PartialEq> FixedSlotRingQueue<T> {
    /// Membuat queue baru dengan kapasitas dan null sentinel.
    ///
    /// Alokasi hanya terjadi sekali di sini.
    ///
    /// # Panics
    /// Panic jika `capacity == 0`
    pub fn new(capacity: usize, null: T) -> Self {
        assert!(capacity > 0, "capacity must be > 0");

        Self {
            slots: vec![null.clone(); capacity].into_boxed_slice(),
            null,
            start: 0,
            end: 0,
        }
    }

    /// Push nilai ke slot di cursor tulis
    ///
    /// Returns `true` jika berhasil, `false` jika queue penuh.
    #[inline]
    pub fn push(&mut self, value: T) -> bool {
        debug_assert!(value != self.null, "pushed value equals the null sentinel");

        if self.slots[self.end] != self.null {
            if cfg!(debug_assertions) {
                tracing::warn!(capacity = self.capacity(), "Cannot push item, queue full");
            }
            return false;
        }

        self.slots[self.end] = value;
        self.end = (self.end + 1) % self.slots.len();
        true
    }

    /// Pop nilai dari cursor baca
    ///
    /// Returns null sentinel jika queue kosong.
    #[inline]
    pub fn pop(&mut self) -> T {
        if self.slots[self.start] == self.null {
            return self.null.clone();
        }

        let item = mem::replace(&mut self.slots[self.start], self.null.clone());
        self.start = (self.start + 1) % self.slots.len();
        item
    }

    /// Buang item pertama tanpa mengembalikannya
    #[inline]
    pub fn remove(&mut self) {
        if self.slots[self.start] != self.null {
            self.slots[self.start] = self.null.clone();
            self.start = (self.start + 1) % self.slots.len();
        }
    }

    /// Item pertama (atau null), tanpa mutasi
    #[inline(always)]
    pub fn peek(&self) -> &T {
        &self.slots[self.start]
    }

    /// Item terakhir yang di-push (atau null jika kosong)
    #[inline(always)]
    pub fn peek_last(&self) -> &T {
        &self.slots[self.last_index()]
    }

    /// Mutable reference ke item terakhir, untuk coalescing in-place
    ///
    /// Returns `None` jika queue kosong.
    #[inline]
    pub fn peek_last_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            return None;
        }
        let idx = self.last_index();
        Some(&mut self.slots[idx])
    }

    /// Item pada posisi relatif terhadap cursor baca
    #[inline]
    pub fn at(&self, position: usize) -> &T {
        debug_assert!(
            position < self.slots.len(),
            "index {} out of bounds for queue with capacity {}",
            position,
            self.slots.len()
        );
        &self.slots[(self.start + position) % self.slots.len()]
    }

    /// Hapus semua item, reset cursor ke awal
    pub fn clear(&mut self) {
        while self.slots[self.start] != self.null {
            self.slots[self.start] = self.null.clone();
            self.start = (self.start + 1) % self.slots.len();
        }
        self.start = 0;
        self.end = 0;
    }

    /// Cek apakah queue kosong
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.slots[self.start] == self.null
    }

    /// Cek apakah queue penuh
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.slots[self.end] != self.null
    }

    /// Jumlah item di queue. O(n): tidak ada field count.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Kapasitas queue
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub fn null_value(&self) -> &T {
        &self.null
    }

    /// Iterator lazy dari cursor baca ke cursor tulis
    ///
    /// Hanya valid untuk snapshot yang tidak sedang dimutasi.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            idx: self.start,
            at_start: true,
        }
    }

    /// Iterator yang mem-pop setiap item sampai queue kosong
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { queue: self }
    }

    #[inline(always)]
    fn last_index(&self) -> usize {
        if self.end == 0 {
            self.slots.len() - 1
        } else {
            self.end - 1
        }
    }
}

/// Forward iterator atas isi queue
pub struct Iter<'a, T> {
    queue: &'a FixedSlotRingQueue<T>,
    idx: usize,
    at_start: bool,
}

impl<'a, T: Clone + PartialEq> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let queue = self.queue;
        if (self.idx == queue.end && !self.at_start) || queue.slots[self.idx] == queue.null {
            return None;
        }

        let item = &queue.slots[self.idx];
        self.idx = (self.idx + 1) % queue.slots.len();
        self.at_start = false;
        Some(item)
    }
}

/// Popping iterator, lihat [`FixedSlotRingQueue::drain`]
pub struct Drain<'a, T> {
    queue: &'a mut FixedSlotRingQueue<T>,
}

impl<T: Clone + PartialEq> Iterator for Drain<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.pop())
        }
    }
}
