//! Deferred actuation: Timer, MessageQueue, DeferredExec
//!
//! Semua komponen di sini memakai pola yang sama: thread producer hanya
//! post ke channel lewat handle, satu thread pemilik men-drain dan
//! menjalankan semuanya.

pub mod action;
mod deferred_exec;
pub mod message;
mod message_queue;
mod timer;

pub use action::{object_id, ActionRef, ActionState, Fire, Oid, TimedAction};
pub use deferred_exec::{DeferredCall, DeferredExec, DeferredExecHandle};
pub use message::{Message, MessageHandler, MessageKind, SenderId, MESSAGE_DATA_SIZE, NO_MESSAGE};
pub use message_queue::{MessageQueue, MessageQueueHandle};
pub use timer::{ActionKind, Timer, TimerHandle};
