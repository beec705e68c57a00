//! Message dan MessageHandler untuk MessageQueue

use crate::time::RawTime;
use std::fmt;
use std::sync::Arc;

/// Discriminant jenis message
pub type MessageKind = u32;

/// Kind 0: null message, tidak pernah di-dispatch
pub const NO_MESSAGE: MessageKind = 0;

/// Ukuran payload inline
pub const MESSAGE_DATA_SIZE: usize = 16;

/// Identitas pengirim message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SenderId(pub u64);

/// Message dengan payload inline 16 byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message {
    kind: MessageKind,
    sender: Option<SenderId>,
    time: RawTime,
    data: [u8; MESSAGE_DATA_SIZE],
}

impl Message {
    /// Message tanpa sender dan payload kosong
    pub const fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            sender: None,
            time: 0,
            data: [0; MESSAGE_DATA_SIZE],
        }
    }

    pub const fn with_sender(mut self, sender: SenderId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Copy payload; lebih dari 16 byte dipotong, kurang diisi nol
    pub fn with_data(mut self, data: &[u8]) -> Self {
        self.set_data(data);
        self
    }

    pub fn set_data(&mut self, data: &[u8]) {
        let len = data.len().min(MESSAGE_DATA_SIZE);
        self.data = [0; MESSAGE_DATA_SIZE];
        self.data[..len].copy_from_slice(&data[..len]);
    }

    #[inline(always)]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[inline(always)]
    pub fn sender(&self) -> Option<SenderId> {
        self.sender
    }

    #[inline(always)]
    pub fn is_from(&self, sender: SenderId) -> bool {
        self.sender == Some(sender)
    }

    /// Waktu post (0 jika belum pernah di-post)
    #[inline(always)]
    pub fn time(&self) -> RawTime {
        self.time
    }

    #[inline(always)]
    pub fn data(&self) -> &[u8; MESSAGE_DATA_SIZE] {
        &self.data
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.kind == NO_MESSAGE
    }

    pub(crate) fn stamp(&mut self, time: RawTime) {
        self.time = time;
    }
}

struct HandlerInner {
    required_sender: Option<SenderId>,
    callback: Box<dyn Fn(&[u8]) + Send + Sync>,
}

/// Callback untuk satu jenis message
///
/// Clone berbagi callback yang sama; dua handler dianggap sama jika
/// berasal dari konstruksi yang sama. Status aktif disimpan per kind
/// di tabel MessageQueue, bukan di handler.
#[derive(Clone)]
pub struct MessageHandler {
    inner: Arc<HandlerInner>,
}

impl MessageHandler {
    /// Handler untuk message dari sender mana pun
    pub fn new(callback: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        Self::build(None, Box::new(callback))
    }

    /// Handler yang hanya menerima message dari `sender`
    pub fn from_sender(sender: SenderId, callback: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        Self::build(Some(sender), Box::new(callback))
    }

    fn build(required_sender: Option<SenderId>, callback: Box<dyn Fn(&[u8]) + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                required_sender,
                callback,
            }),
        }
    }

    #[inline]
    pub fn required_sender(&self) -> Option<SenderId> {
        self.inner.required_sender
    }

    /// Sender cocok dengan filter
    #[inline]
    pub fn should_handle(&self, sender: Option<SenderId>) -> bool {
        match self.inner.required_sender {
            None => true,
            required => required == sender,
        }
    }

    #[inline]
    pub fn handle(&self, message: &Message) {
        (self.inner.callback)(message.data());
    }
}

impl PartialEq for MessageHandler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MessageHandler {}

impl fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandler")
            .field("required_sender", &self.inner.required_sender)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    #[test]
    fn test_default_is_null() {
        assert!(Message::default().is_null());
        assert_eq!(Message::default(), Message::new(NO_MESSAGE));
        assert!(!Message::new(3).is_null());
    }

    #[test]
    fn test_data_is_truncated_and_padded() {
        let m = Message::new(1).with_data(&[7; 20]);
        assert_eq!(m.data(), &[7; MESSAGE_DATA_SIZE]);

        let m = Message::new(1).with_data(&[1, 2]);
        assert_eq!(&m.data()[..3], &[1, 2, 0]);
    }

    #[test]
    fn test_sender_filter() {
        let any = MessageHandler::new(|_| {});
        let only = MessageHandler::from_sender(SenderId(5), |_| {});

        assert!(any.should_handle(None));
        assert!(any.should_handle(Some(SenderId(1))));
        assert!(only.should_handle(Some(SenderId(5))));
        assert!(!only.should_handle(Some(SenderId(1))));
        assert!(!only.should_handle(None));
    }

    #[test]
    fn test_sender_and_time_accessors() {
        let m = Message::new(4).with_sender(SenderId(9));
        assert!(m.is_from(SenderId(9)));
        assert!(!m.is_from(SenderId(1)));
        assert!(!Message::new(4).is_from(SenderId(9)));
        assert_eq!(m.time(), 0);

        let mut stamped = m;
        stamped.stamp(77);
        assert_eq!(stamped.time(), 77);
        assert_eq!(stamped.sender(), Some(SenderId(9)));
    }

    #[test]
    fn test_handler_identity_and_call() {
        let seen = Arc::new(AtomicU8::new(0));
        let s = Arc::clone(&seen);
        let h = MessageHandler::new(move |data| s.store(data[0], Ordering::SeqCst));
        let other = MessageHandler::new(|_| {});

        assert_eq!(h, h.clone());
        assert_ne!(h, other);

        h.handle(&Message::new(2).with_data(&[42]));
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }
}
