//! DeferredExec: antrian function call yang dijalankan di thread pemilik

use crate::config::DeferredExecConfig;
use crate::core::{ChannelSender, DoubleBufferedChannel};
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// Satu deferred call; `Default` adalah null call
#[derive(Clone, Default)]
pub struct DeferredCall(Option<Arc<dyn Fn() + Send + Sync>>);

impl DeferredCall {
    pub fn new(call: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Some(Arc::new(call)))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    #[inline]
    pub fn execute(&self) {
        if let Some(call) = &self.0 {
            call();
        }
    }
}

impl PartialEq for DeferredCall {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeferredCall")
            .field(&if self.is_null() { "null" } else { "fn" })
            .finish()
    }
}

/// Sisi producer DeferredExec
#[derive(Debug, Clone)]
pub struct DeferredExecHandle {
    calls: ChannelSender<DeferredCall>,
}

impl DeferredExecHandle {
    /// Antrekan call untuk `execute_calls` berikutnya
    pub fn post_call(&self, call: DeferredCall) -> bool {
        let posted = self.calls.post(call);
        if !posted && cfg!(debug_assertions) {
            tracing::warn!("Failed to post deferred call, queue full");
        }
        posted
    }
}

#[derive(Debug)]
pub struct DeferredExec {
    calls: DoubleBufferedChannel<DeferredCall>,
}

impl DeferredExec {
    /// # Panics
    /// Panic jika `config.capacity == 0`
    pub fn new(config: DeferredExecConfig) -> Self {
        Self {
            calls: DoubleBufferedChannel::new(config.capacity, DeferredCall::default()),
        }
    }

    /// # Errors
    /// [`ConfigError`](crate::error::ConfigError) jika kapasitas nol.
    pub fn try_new(config: DeferredExecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn handle(&self) -> DeferredExecHandle {
        DeferredExecHandle {
            calls: self.calls.sender(),
        }
    }

    #[inline]
    pub fn post_call(&self, call: DeferredCall) -> bool {
        self.handle().post_call(call)
    }

    /// Jalankan semua call yang terkumpul; call yang di-post selama
    /// eksekusi menunggu pemanggilan berikutnya
    pub fn execute_calls(&mut self) -> usize {
        self.calls.drain_and_process(|call| call.execute())
    }

    pub fn pending(&self) -> usize {
        self.calls.pending()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_execute_in_post_order() {
        let mut exec = DeferredExec::new(DeferredExecConfig { capacity: 8 });
        let log = Arc::new(spin::Mutex::new(Vec::new()));
        for i in 0..3 {
            let l = Arc::clone(&log);
            assert!(exec.post_call(DeferredCall::new(move || l.lock().push(i))));
        }
        assert_eq!(exec.pending(), 3);
        assert_eq!(exec.execute_calls(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(exec.execute_calls(), 0);
    }

    #[test]
    fn test_same_call_posted_twice() {
        let mut exec = DeferredExec::new(DeferredExecConfig { capacity: 4 });
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let call = DeferredCall::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let handle = exec.handle();
        handle.post_call(call.clone());
        handle.post_call(call);
        exec.execute_calls();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_full_queue_and_clear() {
        let mut exec = DeferredExec::new(DeferredExecConfig { capacity: 1 });
        assert!(exec.post_call(DeferredCall::new(|| {})));
        assert!(!exec.post_call(DeferredCall::new(|| {})));
        exec.clear();
        assert_eq!(exec.execute_calls(), 0);
        assert!(DeferredExec::try_new(DeferredExecConfig { capacity: 0 }).is_err());
    }
}
