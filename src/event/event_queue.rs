//! EventQueue: double-buffered event dengan coalescing
//!
//! Event yang bisa digabung (mis. mouse move beruntun) tidak menambah
//! entry baru, tapi digabung ke event terakhir di buffer incoming
//! selama kind-nya sama. Penggabungan terjadi di bawah lock post yang sama.

use crate::config::EventQueueConfig;
use crate::core::{ChannelSender, DoubleBufferedChannel};
use crate::error::Result;
use std::fmt;

/// Payload yang bisa diantrekan di [`EventQueue`]
pub trait Event: Clone + PartialEq + Send {
    /// Discriminant untuk routing dan coalescing
    type Kind: Copy + PartialEq + fmt::Debug;

    fn kind(&self) -> Self::Kind;

    /// `true` jika event berturut-turut dengan kind sama boleh digabung
    fn can_combine(&self) -> bool {
        false
    }

    /// Gabungkan event yang lebih baru ke `self`
    fn combine(&mut self, _newer: &Self) {}
}

/// Penerima event dari [`EventQueue`]
pub trait EventDispatcher<E> {
    /// Returns `false` jika tidak ada yang menangani event
    fn dispatch(&mut self, event: &E) -> bool;
}

impl<E, F> EventDispatcher<E> for F
where
    F: FnMut(&E) -> bool,
{
    #[inline]
    fn dispatch(&mut self, event: &E) -> bool {
        self(event)
    }
}

/// Sisi producer EventQueue
pub struct EventQueueHandle<E> {
    events: ChannelSender<Option<E>>,
}

impl<E> Clone for EventQueueHandle<E> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
        }
    }
}

impl<E: Event> EventQueueHandle<E> {
    /// Post event, atau gabungkan ke event terakhir jika bisa
    ///
    /// Returns `false` jika queue penuh dan event tidak bisa digabung.
    pub fn post_event(&self, event: E) -> bool {
        let kind = event.kind();
        let posted = self.events.post_with(|queue| {
            if event.can_combine() {
                if let Some(Some(last)) = queue.peek_last_mut() {
                    if last.kind() == kind {
                        last.combine(&event);
                        return true;
                    }
                }
            }
            queue.push(Some(event))
        });

        if !posted && cfg!(debug_assertions) {
            tracing::warn!(?kind, "Failed to post event, queue full");
        }
        posted
    }
}

impl<E> fmt::Debug for EventQueueHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueueHandle").finish_non_exhaustive()
    }
}

pub struct EventQueue<E> {
    events: DoubleBufferedChannel<Option<E>>,
    unhandled: u64,
}

impl<E: Event> EventQueue<E> {
    /// # Panics
    /// Panic jika `config.capacity == 0`
    pub fn new(config: EventQueueConfig) -> Self {
        Self {
            events: DoubleBufferedChannel::new(config.capacity, None),
            unhandled: 0,
        }
    }

    /// # Errors
    /// [`ConfigError`](crate::error::ConfigError) jika kapasitas nol.
    pub fn try_new(config: EventQueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn handle(&self) -> EventQueueHandle<E> {
        EventQueueHandle {
            events: self.events.sender(),
        }
    }

    #[inline]
    pub fn post_event(&self, event: E) -> bool {
        self.handle().post_event(event)
    }

    /// Swap lalu kirim setiap event ke `dispatcher`
    ///
    /// Returns jumlah event yang diproses.
    pub fn process_events<D>(&mut self, dispatcher: &mut D) -> usize
    where
        D: EventDispatcher<E>,
    {
        let unhandled = &mut self.unhandled;
        self.events.drain_and_process(|slot| {
            if let Some(event) = slot {
                if !dispatcher.dispatch(&event) {
                    tracing::error!(kind = ?event.kind(), "Unknown event in queue");
                    *unhandled += 1;
                }
            }
        })
    }

    /// Kirim event langsung tanpa antre
    pub fn handle_event<D>(&mut self, event: &E, dispatcher: &mut D) -> bool
    where
        D: EventDispatcher<E>,
    {
        let handled = dispatcher.dispatch(event);
        if !handled {
            tracing::error!(kind = ?event.kind(), "Unknown event");
            self.unhandled += 1;
        }
        handled
    }

    /// Jumlah event yang tidak ditangani dispatcher
    #[inline]
    pub fn unhandled(&self) -> u64 {
        self.unhandled
    }

    /// Event yang menunggu `process_events` berikutnya
    pub fn pending(&self) -> usize {
        self.events.pending()
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl<E> fmt::Debug for EventQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("unhandled", &self.unhandled)
            .finish_non_exhaustive()
    }
}
