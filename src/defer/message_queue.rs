//! MessageQueue: dispatch message ber-kind ke handler terdaftar
//!
//! Pola yang sama dengan Timer: producer post lewat
//! [`MessageQueueHandle`], perubahan tabel handler lewat control channel,
//! dan satu thread pemilik memanggil [`MessageQueue::process_messages`].
//!
//! Setiap registrasi `(kind, handler)` punya flag active sendiri, jadi
//! handler yang sama bisa dilepas dari satu kind tanpa memengaruhi kind lain.

use super::message::{Message, MessageHandler, MessageKind, SenderId, NO_MESSAGE};
use crate::config::MessageQueueConfig;
use crate::core::sync::SpinLock;
use crate::core::{ChannelSender, DoubleBufferedChannel};
use crate::error::Result;
use crate::time::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Satu entry tabel handler: handler + flag active milik entry ini
#[derive(Debug, Clone)]
pub(crate) struct HandlerEntry {
    handler: MessageHandler,
    active: Arc<AtomicBool>,
}

impl HandlerEntry {
    fn new(handler: &MessageHandler) -> Self {
        Self {
            handler: handler.clone(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    #[inline]
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    #[inline]
    fn should_handle(&self, sender: Option<SenderId>) -> bool {
        self.is_active() && self.handler.should_handle(sender)
    }
}

// Entry identik jika flag-nya sama
impl PartialEq for HandlerEntry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.active, &other.active)
    }
}

/// Control message untuk tabel handler
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum HandlerControl {
    #[default]
    NoMessage,
    Add(MessageKind, HandlerEntry),
    Remove(MessageKind, HandlerEntry),
}

/// Sisi producer MessageQueue
#[derive(Clone)]
pub struct MessageQueueHandle {
    clock: Arc<dyn Clock>,
    max_kind: MessageKind,
    messages: ChannelSender<Message>,
    control: ChannelSender<HandlerControl>,
    // Registrasi yang belum dilepas; lock juga menjaga urutan Add/Remove
    registered: Arc<SpinLock<Vec<(MessageKind, HandlerEntry)>>>,
}

impl MessageQueueHandle {
    /// Post message untuk pass berikutnya; waktu post di-stamp di sini
    ///
    /// Returns `false` jika kind di luar range atau queue penuh.
    pub fn post_message(&self, mut message: Message) -> bool {
        if !self.check_kind(message.kind()) {
            return false;
        }
        message.stamp(self.clock.now());

        let posted = self.messages.post(message);
        if !posted && cfg!(debug_assertions) {
            tracing::warn!(kind = message.kind(), "Failed to post message, queue full");
        }
        posted
    }

    /// Daftarkan handler untuk `kind`, aktif mulai pass berikutnya
    pub fn register_handler(&self, kind: MessageKind, handler: &MessageHandler) -> bool {
        if !self.check_kind(kind) {
            return false;
        }

        let entry = HandlerEntry::new(handler);
        let mut registered = self.registered.lock();
        let posted = self.control.post(HandlerControl::Add(kind, entry.clone()));
        if posted {
            registered.push((kind, entry));
        } else if cfg!(debug_assertions) {
            tracing::warn!(kind, "Failed to register message handler, queue full");
        }
        posted
    }

    /// Lepas handler dari `kind`
    ///
    /// Entry untuk `kind` langsung nonaktif dan dihapus di pass berikutnya.
    /// Registrasi handler yang sama untuk kind lain tidak tersentuh.
    /// Returns `true` jika request berhasil di-post.
    pub fn remove_handler(&self, kind: MessageKind, handler: &MessageHandler) -> bool {
        if !self.check_kind(kind) {
            return false;
        }

        let mut registered = self.registered.lock();
        let Some(pos) = registered
            .iter()
            .position(|(k, entry)| *k == kind && entry.handler == *handler)
        else {
            tracing::debug!(kind, "Message handler not registered for kind");
            return false;
        };

        let posted = self
            .control
            .post(HandlerControl::Remove(kind, registered[pos].1.clone()));
        if posted {
            let (_, entry) = registered.swap_remove(pos);
            entry.deactivate();
        } else if cfg!(debug_assertions) {
            tracing::warn!(kind, "Failed to remove message handler, queue full");
        }
        posted
    }

    #[inline]
    pub fn max_kind(&self) -> MessageKind {
        self.max_kind
    }

    fn check_kind(&self, kind: MessageKind) -> bool {
        if kind == NO_MESSAGE || kind > self.max_kind {
            tracing::error!(kind, max_kind = self.max_kind, "Message kind out of range");
            return false;
        }
        true
    }
}

impl std::fmt::Debug for MessageQueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueueHandle")
            .field("max_kind", &self.max_kind)
            .finish_non_exhaustive()
    }
}

/// MessageQueue: pemilik tabel handler
pub struct MessageQueue {
    handle: MessageQueueHandle,
    messages: DoubleBufferedChannel<Message>,
    control: DoubleBufferedChannel<HandlerControl>,
    // Index = kind, 0..=max_kind
    handlers: Box<[Vec<HandlerEntry>]>,
}

impl MessageQueue {
    /// # Panics
    /// Panic jika `config.capacity == 0`
    pub fn new(config: MessageQueueConfig, clock: Arc<dyn Clock>) -> Self {
        let messages = DoubleBufferedChannel::new(config.capacity, Message::default());
        let control = DoubleBufferedChannel::new(config.capacity, HandlerControl::NoMessage);

        let handle = MessageQueueHandle {
            clock,
            max_kind: config.max_kind,
            messages: messages.sender(),
            control: control.sender(),
            registered: Arc::new(SpinLock::new(Vec::new())),
        };

        Self {
            handle,
            messages,
            control,
            handlers: vec![Vec::new(); config.max_kind as usize + 1].into_boxed_slice(),
        }
    }

    /// # Errors
    /// [`ConfigError`](crate::error::ConfigError) jika konfigurasi tidak valid.
    pub fn try_new(config: MessageQueueConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config, clock))
    }

    #[inline]
    pub fn handle(&self) -> MessageQueueHandle {
        self.handle.clone()
    }

    #[inline]
    pub fn post_message(&self, message: Message) -> bool {
        self.handle.post_message(message)
    }

    #[inline]
    pub fn register_handler(&self, kind: MessageKind, handler: &MessageHandler) -> bool {
        self.handle.register_handler(kind, handler)
    }

    #[inline]
    pub fn remove_handler(&self, kind: MessageKind, handler: &MessageHandler) -> bool {
        self.handle.remove_handler(kind, handler)
    }

    /// Terapkan semua perubahan tabel handler yang menunggu
    pub fn process_internal_messages(&mut self) -> usize {
        let handlers = &mut self.handlers;

        self.control.drain_and_process(|control| match control {
            HandlerControl::Add(kind, entry) => {
                if let Some(list) = handlers.get_mut(kind as usize) {
                    list.push(entry);
                }
            }
            HandlerControl::Remove(kind, entry) => {
                if let Some(list) = handlers.get_mut(kind as usize) {
                    if let Some(pos) = list.iter().position(|e| *e == entry) {
                        list.remove(pos);
                    }
                }
            }
            HandlerControl::NoMessage => {
                tracing::warn!("Unrecognized message queue control message");
            }
        })
    }

    /// Satu pass: terapkan perubahan handler lalu dispatch semua message
    ///
    /// Message yang di-post dari dalam handler masuk ke pass berikutnya.
    /// Returns jumlah message yang di-dispatch.
    pub fn process_messages(&mut self) -> usize {
        self.process_internal_messages();

        let handlers = &self.handlers;
        self.messages
            .drain_and_process(|message| dispatch(handlers, &message))
    }

    /// Panggil handler untuk `message` sekarang juga, tanpa antre
    pub fn trigger_message(&self, message: &Message) {
        if message.kind() > self.handle.max_kind {
            tracing::error!(
                kind = message.kind(),
                max_kind = self.handle.max_kind,
                "Message kind out of range"
            );
            return;
        }
        dispatch(&self.handlers, message);
    }

    /// Hapus semua handler dari semua kind
    pub fn clear_handlers(&mut self) {
        for (_, entry) in self.handle.registered.lock().drain(..) {
            entry.deactivate();
        }
        for list in self.handlers.iter_mut() {
            list.clear();
        }
    }

    /// Teardown: buang message, control, dan handler
    pub fn clear(&mut self) {
        self.messages.clear();
        self.control.clear();
        self.clear_handlers();
    }

    /// Jumlah handler terdaftar (termasuk yang sudah nonaktif) untuk `kind`
    pub fn handler_count(&self, kind: MessageKind) -> usize {
        self.handlers.get(kind as usize).map_or(0, Vec::len)
    }

    /// Message yang menunggu pass berikutnya
    pub fn pending(&self) -> usize {
        self.messages.pending()
    }

    #[inline]
    pub fn max_kind(&self) -> MessageKind {
        self.handle.max_kind
    }

    pub fn capacity(&self) -> usize {
        self.messages.capacity()
    }
}

impl std::fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("max_kind", &self.handle.max_kind)
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

#[inline]
fn dispatch(handlers: &[Vec<HandlerEntry>], message: &Message) {
    let Some(list) = handlers.get(message.kind() as usize) else {
        return;
    };
    for entry in list {
        if entry.should_handle(message.sender()) {
            entry.handler.handle(message);
        }
    }
}
