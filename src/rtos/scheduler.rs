//! Cooperative periodic event scheduler
//!
//! Events are (interval, callback) pairs kept in a fixed table of
//! [`MAX_EVENTS`] slots. The foreground loop calls [`Scheduler::refresh`];
//! each event whose interval has elapsed since it last fired is invoked once
//! and stamped with the current time. There is no catch-up: an event that is
//! late by several intervals still fires only once, and the next deadline is
//! measured from the late firing, so intervals mean "at least every N ms".
//!
//! Never call into the scheduler from an interrupt handler. Callbacks may run
//! for an unbounded time and the event table is foreground-only state.

use super::callback::Callback;
use super::clock::Clock;
use crate::config::MAX_EVENTS;

/// Identifier handed out by [`Scheduler::register`], unique among live events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventId(u8);

impl EventId {
    #[inline]
    pub fn raw(self) -> u8 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchedulerError {
    /// All event slots are taken
    Full,
    /// A zero interval was requested at registration
    ZeroInterval,
    /// No live event has the identifier, or the modification was invalid
    NotFound,
}

impl ufmt::uDisplay for SchedulerError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(match self {
            SchedulerError::Full => "event table full",
            SchedulerError::ZeroInterval => "zero interval",
            SchedulerError::NotFound => "no such event",
        })
    }
}

#[derive(Clone, Copy)]
struct Event<'a> {
    id: EventId,
    interval_ms: u16,
    last_fired: u32,
    callback: Callback<'a>,
}

/// The scheduler borrows its callbacks; whoever registers a handler object
/// has to unregister it before the object goes away, which the `'a` bound
/// enforces.
pub struct Scheduler<'a, C: Clock> {
    clock: &'a C,
    events: [Option<Event<'a>>; MAX_EVENTS],
    event_count: usize,
    next_id: u8,
    last_refresh_ms: u32,
}

impl<'a, C: Clock> Scheduler<'a, C> {
    pub fn new(clock: &'a C) -> Self {
        Self {
            clock,
            events: [None; MAX_EVENTS],
            event_count: 0,
            next_id: 0,
            last_refresh_ms: clock.now_ms(),
        }
    }

    /// Register a periodic callback firing every `interval_ms` milliseconds.
    pub fn register(
        &mut self,
        interval_ms: u16,
        callback: impl Into<Callback<'a>>,
    ) -> Result<EventId, SchedulerError> {
        if self.event_count >= MAX_EVENTS {
            warn!("scheduler full, event rejected");
            return Err(SchedulerError::Full);
        }
        if interval_ms == 0 {
            return Err(SchedulerError::ZeroInterval);
        }

        let id = self.allocate_id();
        let event = Event {
            id,
            interval_ms,
            last_fired: self.clock.now_ms(),
            callback: callback.into(),
        };

        for slot in self.events.iter_mut() {
            if slot.is_none() {
                *slot = Some(event);
                self.event_count += 1;
                debug!("event {=u8} registered every {=u16}ms", id.0, interval_ms);
                return Ok(id);
            }
        }
        Err(SchedulerError::Full)
    }

    /// Change the interval of a live event and, when given, its callback.
    pub fn modify(
        &mut self,
        id: EventId,
        interval_ms: u16,
        callback: Option<Callback<'a>>,
    ) -> Result<(), SchedulerError> {
        if interval_ms == 0 {
            return Err(SchedulerError::NotFound);
        }
        let event = self.find_mut(id).ok_or(SchedulerError::NotFound)?;
        event.interval_ms = interval_ms;
        if let Some(callback) = callback {
            event.callback = callback;
        }
        Ok(())
    }

    /// Remove the event with the given identifier.
    pub fn unregister(&mut self, id: EventId) -> Result<(), SchedulerError> {
        for slot in self.events.iter_mut() {
            if matches!(slot, Some(event) if event.id == id) {
                *slot = None;
                self.event_count -= 1;
                debug!("event {=u8} unregistered", id.0);
                return Ok(());
            }
        }
        Err(SchedulerError::NotFound)
    }

    /// Fire every due event once. Returns how many fired.
    ///
    /// Nothing happens unless the clock moved since the previous refresh.
    pub fn refresh(&mut self) -> usize {
        let now = self.clock.now_ms();
        if now == self.last_refresh_ms {
            return 0;
        }
        self.last_refresh_ms = now;

        let mut fired = 0;
        for event in self.events.iter_mut().flatten() {
            if now.wrapping_sub(event.last_fired) >= u32::from(event.interval_ms) {
                event.callback.invoke();
                event.last_fired = now;
                fired += 1;
            }
        }
        fired
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.events.iter().flatten().any(|event| event.id == id)
    }

    pub fn len(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.event_count == 0
    }

    pub fn is_full(&self) -> bool {
        self.event_count >= MAX_EVENTS
    }

    fn find_mut(&mut self, id: EventId) -> Option<&mut Event<'a>> {
        self.events.iter_mut().flatten().find(|event| event.id == id)
    }

    // At most MAX_EVENTS ids are live out of 256, so this terminates.
    fn allocate_id(&mut self) -> EventId {
        loop {
            let candidate = EventId(self.next_id);
            self.next_id = self.next_id.wrapping_add(1);
            if !self.contains(candidate) {
                return candidate;
            }
        }
    }
}
