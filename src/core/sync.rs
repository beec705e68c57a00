//! Primitive sinkronisasi untuk channel
//!
//! Satu-satunya lock di crate ini adalah spin-lock pendek di sekitar
//! push dan swap buffer. Di bawah `cfg(loom)` semua primitive diganti
//! dengan versi loom supaya interleaving bisa di-model.

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::Arc;

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicU64, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::Arc;

#[cfg(not(loom))]
pub(crate) type SpinGuard<'a, T> = spin::MutexGuard<'a, T>;
#[cfg(loom)]
pub(crate) type SpinGuard<'a, T> = loom::sync::MutexGuard<'a, T>;

/// Spin-lock untuk critical section O(1)
///
/// Lock di-acquire dengan Acquire dan di-release dengan Release, jadi
/// semua tulisan sebelum unlock visible ke thread yang lock berikutnya.
pub(crate) struct SpinLock<T> {
    #[cfg(not(loom))]
    inner: spin::Mutex<T>,
    #[cfg(loom)]
    inner: loom::sync::Mutex<T>,
}

impl<T> SpinLock<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            #[cfg(not(loom))]
            inner: spin::Mutex::new(value),
            #[cfg(loom)]
            inner: loom::sync::Mutex::new(value),
        }
    }

    #[cfg(not(loom))]
    #[inline(always)]
    pub(crate) fn lock(&self) -> SpinGuard<'_, T> {
        self.inner.lock()
    }

    #[cfg(loom)]
    #[inline(always)]
    pub(crate) fn lock(&self) -> SpinGuard<'_, T> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinLock").finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_lock_serializes_writers() {
        let counter = Arc::new(SpinLock::new(0u64));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*counter.lock(), 40_000);
    }
}
