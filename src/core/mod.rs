//! Core module: primitive untuk deferred actuation
//!
//! Prinsip desain:
//! - Fixed capacity: semua buffer pre-allocated saat init
//! - Short critical section: lock hanya di sekitar push dan swap
//! - No per-event allocation: node diambil dari free list, bukan heap

mod channel;
mod node_store;
mod ring_queue;
pub(crate) mod sync;

pub use channel::{ChannelSender, DoubleBufferedChannel};
pub use node_store::{IntrusiveNodeStore, NodeId, RingId, RingIter, DEFAULT_MAX_BLOCKS};
pub use ring_queue::{Drain, FixedSlotRingQueue, Iter};
