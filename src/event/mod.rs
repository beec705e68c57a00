//! Event queue dengan coalescing

mod event_queue;

pub use event_queue::{Event, EventDispatcher, EventQueue, EventQueueHandle};
