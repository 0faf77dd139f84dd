//! Peripheral drivers and the root object that owns them

pub mod adc;
pub mod eeprom;
pub mod exint;
pub mod timer;
pub mod uart;

#[cfg(target_arch = "avr")]
pub mod avr;

pub use adc::{AdcPort, Sampler, SamplerError};
pub use eeprom::{EepromPort, NvError, NvWriter};
pub use exint::{Edge, ExtIntPort, Line, SignalDispatch};
pub use timer::{Prescaler, TickTimer};
pub use uart::{ByteQueue, LinkSettings, Serial, UsartPort, LINK};

use crate::config::TICK_TIMER_TOP;
use crate::rtos::SystemClock;
use core::cell::RefCell;
use critical_section::Mutex;

/// Every interrupt-fed driver of the controller, built once.
///
/// The firmware keeps a single instance in a `static` so interrupt vectors
/// and the foreground loop reach the same drivers; consumers get a
/// reference to it (or to one of its fields) instead of a global accessor.
pub struct Hal<'a, A, E, U, X, T> {
    pub clock: SystemClock,
    pub sampler: Sampler<A>,
    pub eeprom: NvWriter<'a, E>,
    pub serial: Serial<U>,
    pub signals: SignalDispatch<'a, X>,
    timer: Mutex<RefCell<T>>,
}

impl<'a, A, E, U, X, T> Hal<'a, A, E, U, X, T>
where
    A: AdcPort,
    E: EepromPort,
    U: UsartPort,
    X: ExtIntPort,
    T: TickTimer,
{
    pub const fn new(adc: A, eeprom: E, usart: U, exint: X, timer: T) -> Self {
        Self {
            clock: SystemClock::new(),
            sampler: Sampler::new(adc),
            eeprom: NvWriter::new(eeprom),
            serial: Serial::new(usart),
            signals: SignalDispatch::new(exint),
            timer: Mutex::new(RefCell::new(timer)),
        }
    }

    /// Configure the peripherals and start the ADC scan. Global interrupts
    /// are left to the caller.
    pub fn start(&self) {
        self.sampler.configure();
        self.sampler.start();
        self.serial.configure();
        critical_section::with(|cs| {
            self.timer
                .borrow_ref_mut(cs)
                .configure_millisecond_tick(TICK_TIMER_TOP)
        });
        info!("peripherals started");
    }

    /// Suspend the ADC scan ahead of a sleep mode.
    pub fn enter_low_power(&self) {
        self.sampler.set_power(false);
    }

    /// Resume the ADC scan after waking.
    pub fn leave_low_power(&self) {
        self.sampler.set_power(true);
    }

    #[inline]
    pub fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    #[inline]
    pub fn now_s(&self) -> u16 {
        self.clock.now_s()
    }
}
