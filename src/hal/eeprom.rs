//! Interrupt-driven EEPROM writer with synchronous reads
//!
//! A write job streams one byte per EEPROM-ready interrupt, so the
//! foreground never waits for the multi-millisecond programming time. The
//! job borrows the caller's bytes for `'a`; the borrow checker keeps them
//! alive and unmodified for as long as the writer might still read them.

use crate::config::EEPROM_SIZE;
use core::cell::RefCell;
use critical_section::Mutex;

/// Register-level EEPROM access.
pub trait EepromPort {
    /// Load address and data and issue the write strobes.
    fn write_byte(&mut self, address: u16, byte: u8);
    /// Load address, issue the read strobe and return the data register.
    fn read_byte(&mut self, address: u16) -> u8;
    /// Enable or disable the EEPROM-ready interrupt.
    fn set_ready_interrupt(&mut self, enabled: bool);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvError {
    /// A write job is still in progress
    Busy,
    /// The range does not fit in the EEPROM
    OutOfRange,
}

impl ufmt::uDisplay for NvError {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        f.write_str(match self {
            NvError::Busy => "EEPROM busy",
            NvError::OutOfRange => "EEPROM range exceeded",
        })
    }
}

struct WriterState<'a, P> {
    port: P,
    busy: bool,
    next_address: u16,
    source: &'a [u8],
    cursor: usize,
}

pub struct NvWriter<'a, P> {
    state: Mutex<RefCell<WriterState<'a, P>>>,
}

impl<'a, P: EepromPort> NvWriter<'a, P> {
    pub const fn new(port: P) -> Self {
        Self {
            state: Mutex::new(RefCell::new(WriterState {
                port,
                busy: false,
                next_address: 0,
                source: &[],
                cursor: 0,
            })),
        }
    }

    pub fn is_busy(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).busy)
    }

    /// Start streaming `source` to `address`.
    ///
    /// Returns the address right after the written region. An empty
    /// `source` completes immediately without touching the hardware.
    pub fn write(&self, address: u16, source: &'a [u8]) -> Result<u16, NvError> {
        let end = check_range(address, source.len())?;
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.busy {
                return Err(NvError::Busy);
            }
            if source.is_empty() {
                return Ok(end);
            }
            state.busy = true;
            state.next_address = address;
            state.source = source;
            state.cursor = 0;
            state.port.set_ready_interrupt(true);
            Ok(end)
        })
        .map(|end| {
            trace!("EEPROM write {=usize} bytes at {=u16}", source.len(), address);
            end
        })
    }

    /// Copy `destination.len()` bytes starting at `address`, blocking.
    ///
    /// Refused while a write job is running. Returns the address right after
    /// the region read.
    pub fn read(&self, address: u16, destination: &mut [u8]) -> Result<u16, NvError> {
        let end = check_range(address, destination.len())?;
        if self.is_busy() {
            return Err(NvError::Busy);
        }
        // Only the foreground starts jobs, so the writer stays idle from here.
        let mut cursor = address;
        for byte in destination.iter_mut() {
            *byte = critical_section::with(|cs| self.state.borrow_ref_mut(cs).port.read_byte(cursor));
            cursor += 1;
        }
        Ok(end)
    }

    /// EEPROM-ready interrupt body.
    pub fn on_ready(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if !state.busy {
                state.port.set_ready_interrupt(false);
                return;
            }
            if state.cursor == state.source.len() {
                state.port.set_ready_interrupt(false);
                state.busy = false;
                state.source = &[];
                return;
            }
            let address = state.next_address;
            let byte = state.source[state.cursor];
            state.port.write_byte(address, byte);
            state.cursor += 1;
            state.next_address = address.wrapping_add(1);
        });
    }
}

fn check_range(address: u16, len: usize) -> Result<u16, NvError> {
    let end = usize::from(address) + len;
    if end > EEPROM_SIZE {
        return Err(NvError::OutOfRange);
    }
    Ok(end as u16)
}
