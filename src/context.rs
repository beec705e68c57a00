//! DeferContext: satu objek yang memiliki semua komponen deferred
//!
//! Dibuat sekali saat start, di-pass eksplisit ke subsystem yang butuh,
//! dan di-teardown sekali saat selesai. Thread lain hanya memegang
//! [`DeferHandles`].

use crate::config::DeferConfig;
use crate::defer::{
    DeferredExec, DeferredExecHandle, MessageQueue, MessageQueueHandle, Timer, TimerHandle,
};
use crate::error::Result;
use crate::event::{Event, EventDispatcher, EventQueue, EventQueueHandle};
use crate::time::{Clock, MonotonicClock};
use std::sync::Arc;

/// Handle producer untuk semua komponen
pub struct DeferHandles<E> {
    pub timer: TimerHandle,
    pub messages: MessageQueueHandle,
    pub events: EventQueueHandle<E>,
    pub deferred: DeferredExecHandle,
}

impl<E> Clone for DeferHandles<E> {
    fn clone(&self) -> Self {
        Self {
            timer: self.timer.clone(),
            messages: self.messages.clone(),
            events: self.events.clone(),
            deferred: self.deferred.clone(),
        }
    }
}

impl<E> std::fmt::Debug for DeferHandles<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferHandles").finish_non_exhaustive()
    }
}

/// Hasil satu `pump`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub calls: usize,
    pub messages: usize,
    pub events: usize,
    pub fired: usize,
}

impl PumpStats {
    pub fn total(&self) -> usize {
        self.calls + self.messages + self.events + self.fired
    }
}

pub struct DeferContext<E> {
    timer: Timer,
    messages: MessageQueue,
    events: EventQueue<E>,
    deferred: DeferredExec,
    shut_down: bool,
}

impl<E: Event> DeferContext<E> {
    /// Context dengan [`MonotonicClock`]
    ///
    /// # Errors
    /// [`ConfigError`](crate::error::ConfigError) jika konfigurasi tidak valid.
    pub fn new(config: DeferConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Context dengan clock yang di-inject
    pub fn with_clock(config: DeferConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let context = Self {
            timer: Timer::new(config.timer, Arc::clone(&clock)),
            messages: MessageQueue::new(config.messages, clock),
            events: EventQueue::new(config.events),
            deferred: DeferredExec::new(config.deferred),
            shut_down: false,
        };
        tracing::debug!(
            timer_queue = config.timer.queue_size,
            message_capacity = config.messages.capacity,
            event_capacity = config.events.capacity,
            "Defer context initialised"
        );
        Ok(context)
    }

    pub fn handles(&self) -> DeferHandles<E> {
        DeferHandles {
            timer: self.timer.handle(),
            messages: self.messages.handle(),
            events: self.events.handle(),
            deferred: self.deferred.handle(),
        }
    }

    /// Satu siklus: deferred calls, messages, events, lalu timer tick
    pub fn pump<D>(&mut self, dispatcher: &mut D) -> PumpStats
    where
        D: EventDispatcher<E>,
    {
        if self.shut_down {
            tracing::warn!("Pump called after shutdown");
            return PumpStats::default();
        }

        PumpStats {
            calls: self.deferred.execute_calls(),
            messages: self.messages.process_messages(),
            events: self.events.process_events(dispatcher),
            fired: self.timer.tick(),
        }
    }

    /// Teardown semua komponen; panggilan kedua adalah no-op
    ///
    /// Returns `true` jika teardown benar-benar dijalankan.
    pub fn shutdown(&mut self) -> bool {
        if self.shut_down {
            tracing::warn!("Cannot shut down defer context more than once");
            return false;
        }

        self.timer.clear();
        self.messages.clear();
        self.events.clear();
        self.deferred.clear();
        self.shut_down = true;

        tracing::debug!("Defer context shut down");
        true
    }

    #[inline]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut Timer {
        &mut self.timer
    }

    pub fn messages(&self) -> &MessageQueue {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageQueue {
        &mut self.messages
    }

    pub fn events(&self) -> &EventQueue<E> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue<E> {
        &mut self.events
    }

    pub fn deferred(&self) -> &DeferredExec {
        &self.deferred
    }

    pub fn deferred_mut(&mut self) -> &mut DeferredExec {
        &mut self.deferred
    }
}

impl<E> std::fmt::Debug for DeferContext<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferContext")
            .field("timer", &self.timer)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::defer::{DeferredCall, Message, MessageHandler, TimedAction};
    use crate::error::ConfigError;
    use crate::time::{millis_to_raw, ManualClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    impl Event for Ping {
        type Kind = ();
        fn kind(&self) {}
    }

    fn context() -> (DeferContext<Ping>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let ctx = DeferContext::with_clock(DeferConfig::default(), clock.clone()).unwrap();
        (ctx, clock)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DeferConfig::default();
        config.events.capacity = 0;
        let err = DeferContext::<Ping>::new(config).unwrap_err();
        assert_eq!(err, ConfigError::ZeroCapacity { component: "event queue" });
    }

    #[test]
    fn test_pump_runs_every_component() {
        let (mut ctx, clock) = context();
        let handles = ctx.handles();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = Arc::clone(&hits);
        handles.deferred.post_call(DeferredCall::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        let h = Arc::clone(&hits);
        let handler = MessageHandler::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        handles.messages.register_handler(1, &handler);
        handles.messages.post_message(Message::new(1));

        handles.events.post_event(Ping(1));

        let h = Arc::clone(&hits);
        let action = TimedAction::new(millis_to_raw(1), move || {
            h.fetch_add(1, Ordering::SeqCst);
            false
        });
        handles.timer.register_singular(&action);

        let mut events = 0;
        let mut dispatcher = |_: &Ping| {
            events += 1;
            true
        };
        let stats = ctx.pump(&mut dispatcher);
        assert_eq!(
            stats,
            PumpStats {
                calls: 1,
                messages: 1,
                events: 1,
                fired: 0
            }
        );

        clock.advance_millis(2);
        let stats = ctx.pump(&mut dispatcher);
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.total(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(events, 1);
    }

    #[test]
    fn test_shutdown_only_once() {
        let (mut ctx, _) = context();
        let action = TimedAction::new(10, || true);
        ctx.handles().timer.register_repeated(&action);
        ctx.pump(&mut |_: &Ping| true);
        assert_eq!(TimedAction::retain_count(&action), 2);

        assert!(ctx.shutdown());
        assert!(ctx.is_shut_down());
        assert!(action.was_removed());
        assert_eq!(TimedAction::retain_count(&action), 1);

        assert!(!ctx.shutdown());
        assert_eq!(ctx.pump(&mut |_: &Ping| true), PumpStats::default());
    }
}
