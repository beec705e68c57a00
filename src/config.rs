//! Konfigurasi ukuran komponen
//!
//! Semua ukuran ditentukan saat konstruksi. Tidak ada opsi yang bisa
//! diubah saat runtime; melebihi kapasitas adalah kondisi runtime,
//! bukan error konfigurasi.

use crate::core::DEFAULT_MAX_BLOCKS;
use crate::error::{ConfigError, Result};

/// Batas atas `max_kind` untuk tabel handler MessageQueue
pub const MAX_KIND_LIMIT: u32 = 4096;

/// Timer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Kapasitas tiap input channel (singular dan repeated)
    pub queue_size: usize,
    /// Perkiraan jumlah action aktif; dipakai sebagai block size node store
    pub average_num_actions: usize,
    /// Jumlah block maksimum node store
    pub max_blocks: usize,
}

impl TimerConfig {
    pub const fn new(queue_size: usize, average_num_actions: usize) -> Self {
        Self {
            queue_size,
            average_num_actions,
            max_blocks: DEFAULT_MAX_BLOCKS,
        }
    }

    /// Kapasitas control channel: 1.5x action rata-rata + 2x queue size
    pub const fn control_capacity(&self) -> usize {
        self.average_num_actions * 3 / 2 + self.queue_size * 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_size == 0 {
            return Err(ConfigError::ZeroCapacity {
                component: "timer input queue",
            });
        }
        if self.average_num_actions == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.max_blocks == 0 {
            return Err(ConfigError::ZeroMaxBlocks);
        }
        Ok(())
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new(64, 32)
    }
}

/// MessageQueue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQueueConfig {
    pub capacity: usize,
    /// Kind terbesar yang boleh dipakai (inklusif)
    pub max_kind: u32,
}

impl MessageQueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                component: "message queue",
            });
        }
        if self.max_kind > MAX_KIND_LIMIT {
            return Err(ConfigError::MaxKindTooLarge {
                max_kind: self.max_kind,
                limit: MAX_KIND_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for MessageQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_kind: 64,
        }
    }
}

/// EventQueue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQueueConfig {
    pub capacity: usize,
}

impl EventQueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                component: "event queue",
            });
        }
        Ok(())
    }
}

impl Default for EventQueueConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// DeferredExec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredExecConfig {
    pub capacity: usize,
}

impl DeferredExecConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                component: "deferred exec queue",
            });
        }
        Ok(())
    }
}

impl Default for DeferredExecConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

/// Konfigurasi lengkap untuk [`DeferContext`](crate::context::DeferContext)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferConfig {
    pub timer: TimerConfig,
    pub messages: MessageQueueConfig,
    pub events: EventQueueConfig,
    pub deferred: DeferredExecConfig,
}

impl DeferConfig {
    /// Validasi semua ukuran
    ///
    /// # Errors
    /// [`ConfigError`] pertama yang ditemukan.
    pub fn validate(&self) -> Result<()> {
        self.timer.validate()?;
        self.messages.validate()?;
        self.events.validate()?;
        self.deferred.validate()
    }
}
