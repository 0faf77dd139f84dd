//! System time tracking driven by the millisecond timer interrupt

use crate::config::MS_PER_SECOND;
use core::cell::Cell;
use critical_section::Mutex;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Monotonic millisecond and second counters.
///
/// Only the timer interrupt calls [`SystemClock::tick`]; everyone else reads.
/// Reads happen inside a critical section so the 32-bit value is never torn
/// by a tick landing between byte loads.
pub struct SystemClock {
    ticks_ms: Mutex<Cell<u32>>,
    ticks_s: Mutex<Cell<u16>>,
}

impl SystemClock {
    /// Create a clock at zero
    pub const fn new() -> Self {
        Self {
            ticks_ms: Mutex::new(Cell::new(0)),
            ticks_s: Mutex::new(Cell::new(0)),
        }
    }

    /// Advance by one millisecond. Called from the timer compare interrupt.
    #[inline]
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let ms = self.ticks_ms.borrow(cs);
            let now = ms.get().wrapping_add(1);
            ms.set(now);
            if now % MS_PER_SECOND == 0 {
                let s = self.ticks_s.borrow(cs);
                s.set(s.get().wrapping_add(1));
            }
        });
    }

    /// Milliseconds since start, wrapping at `u32::MAX`
    #[inline]
    pub fn now_ms(&self) -> u32 {
        critical_section::with(|cs| self.ticks_ms.borrow(cs).get())
    }

    /// Seconds since start
    #[inline]
    pub fn now_s(&self) -> u16 {
        critical_section::with(|cs| self.ticks_s.borrow(cs).get())
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_ms(&self) -> u32 {
        SystemClock::now_ms(self)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}
