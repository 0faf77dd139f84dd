//! Engine speed from ignition pulses on an external interrupt line
//!
//! Pulses are counted by the line's interrupt. Every
//! [`TACHOMETER_WINDOW_MS`] a scheduler event moves the count into an
//! 8-slot ring; the speed is the ring total scaled to one minute.

use crate::config::TACHOMETER_WINDOW_MS;
use crate::hal::{ExtIntPort, Line, SignalDispatch};
use crate::rtos::{Callback, Clock, EventId, Handler, Scheduler, SchedulerError};
use core::cell::{Cell, RefCell};
use critical_section::Mutex;

const WINDOWS: usize = 8;
const RPM_PER_COUNT: u16 = (60_000 / (TACHOMETER_WINDOW_MS as u32 * WINDOWS as u32)) as u16;

/// Pulse counter bound to the external line.
pub struct PulseCounter {
    count: Mutex<Cell<u8>>,
}

impl PulseCounter {
    const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    // Read and clear in one step so no pulse lands between the two.
    fn take(&self) -> u8 {
        critical_section::with(|cs| self.count.borrow(cs).replace(0))
    }
}

impl Handler for PulseCounter {
    fn handle(&self) {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().saturating_add(1));
        });
    }
}

struct History {
    counts: [u8; WINDOWS],
    index: usize,
}

pub struct Tachometer {
    pulses: PulseCounter,
    history: Mutex<RefCell<History>>,
}

impl Tachometer {
    pub const LINE: Line = Line::Int1;

    pub const fn new() -> Self {
        Self {
            pulses: PulseCounter::new(),
            history: Mutex::new(RefCell::new(History {
                counts: [0; WINDOWS],
                index: 0,
            })),
        }
    }

    /// Hook the pulse input and the window event up.
    pub fn attach<'a, C: Clock, P: ExtIntPort>(
        &'a self,
        scheduler: &mut Scheduler<'a, C>,
        signals: &SignalDispatch<'a, P>,
    ) -> Result<EventId, SchedulerError> {
        let id = scheduler.register(TACHOMETER_WINDOW_MS, self)?;
        signals.bind(Self::LINE, Some(Callback::from(&self.pulses)));
        Ok(id)
    }

    pub fn detach<'a, C: Clock, P: ExtIntPort>(
        &'a self,
        id: EventId,
        scheduler: &mut Scheduler<'a, C>,
        signals: &SignalDispatch<'a, P>,
    ) -> Result<(), SchedulerError> {
        signals.bind(Self::LINE, None);
        scheduler.unregister(id)
    }

    /// Revolutions per minute over the last eight windows.
    pub fn rpm(&self) -> u16 {
        let total: u16 = critical_section::with(|cs| {
            self.history
                .borrow_ref(cs)
                .counts
                .iter()
                .map(|&c| u16::from(c))
                .sum()
        });
        total * RPM_PER_COUNT
    }

    fn close_window(&self) {
        let count = self.pulses.take();
        critical_section::with(|cs| {
            let mut history = self.history.borrow_ref_mut(cs);
            let index = history.index;
            history.counts[index] = count;
            history.index = (index + 1) % WINDOWS;
        });
    }
}

impl Handler for Tachometer {
    fn handle(&self) {
        self.close_window();
    }
}

impl Default for Tachometer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::Edge;
    use crate::rtos::SystemClock;

    struct NoPins;

    impl ExtIntPort for NoPins {
        fn enable(&mut self, _line: Line, _edge: Edge) {}
        fn disable(&mut self, _line: Line) {}
    }

    fn pulses(dispatch: &SignalDispatch<'_, NoPins>, n: usize) {
        for _ in 0..n {
            dispatch.on_interrupt(Tachometer::LINE);
        }
    }

    fn advance(clock: &SystemClock, scheduler: &mut Scheduler<'_, SystemClock>, ms: u16) {
        for _ in 0..ms {
            clock.tick();
            scheduler.refresh();
        }
    }

    #[test]
    fn reports_zero_before_any_pulse() {
        assert_eq!(Tachometer::new().rpm(), 0);
    }

    #[test]
    fn counts_pulses_per_window() {
        let clock = SystemClock::new();
        let tacho = Tachometer::new();
        let dispatch = SignalDispatch::new(NoPins);
        let mut scheduler = Scheduler::new(&clock);
        tacho.attach(&mut scheduler, &dispatch).unwrap();

        // 5 pulses in each of 8 windows: 40 counts → 40 * 31 rpm
        for _ in 0..WINDOWS {
            pulses(&dispatch, 5);
            advance(&clock, &mut scheduler, TACHOMETER_WINDOW_MS);
        }
        assert_eq!(tacho.rpm(), 40 * RPM_PER_COUNT);

        // a silent window replaces the oldest one
        advance(&clock, &mut scheduler, TACHOMETER_WINDOW_MS);
        assert_eq!(tacho.rpm(), 35 * RPM_PER_COUNT);
    }

    #[test]
    fn detach_stops_counting() {
        let clock = SystemClock::new();
        let tacho = Tachometer::new();
        let dispatch = SignalDispatch::new(NoPins);
        let mut scheduler = Scheduler::new(&clock);
        let id = tacho.attach(&mut scheduler, &dispatch).unwrap();

        tacho.detach(id, &mut scheduler, &dispatch).unwrap();
        pulses(&dispatch, 10);
        advance(&clock, &mut scheduler, TACHOMETER_WINDOW_MS);
        assert!(scheduler.is_empty());
        assert_eq!(tacho.rpm(), 0);
        assert_eq!(tacho.pulses.take(), 0);
    }
}
