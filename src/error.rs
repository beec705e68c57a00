//! Error types
//!
//! Kondisi runtime (queue penuh, lookup miss) tidak pernah jadi error:
//! dilaporkan lewat `bool` atau sentinel. Error di sini hanya untuk
//! konfigurasi yang tidak valid saat konstruksi.

use thiserror::Error;

/// Result alias untuk konstruksi komponen
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Konfigurasi tidak valid
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{component} capacity must be > 0")]
    ZeroCapacity { component: &'static str },

    #[error("node store block size must be > 0")]
    ZeroBlockSize,

    #[error("node store max blocks must be > 0")]
    ZeroMaxBlocks,

    #[error("max message kind {max_kind} exceeds limit {limit}")]
    MaxKindTooLarge { max_kind: u32, limit: u32 },
}
