//! ATmega328P register glue for the driver ports
#![allow(clippy::missing_safety_doc)]

use super::adc::AdcPort;
use super::eeprom::EepromPort;
use super::exint::{Edge, ExtIntPort, Line};
use super::timer::{Prescaler, TickTimer};
use super::uart::{LinkSettings, UsartPort};
use avr_device::atmega328p::{ADC, CPU, EEPROM, EXINT, TC0, USART0};
use embedded_hal::serial;

// ADMUX
const REFS0: u8 = 1 << 6;
const MUX_MASK: u8 = 0x0F;
// ADCSRA
const ADEN: u8 = 1 << 7;
const ADSC: u8 = 1 << 6;
const ADIE: u8 = 1 << 3;
const ADPS_DIV64: u8 = 0x06;

// EECR
const EERIE: u8 = 1 << 3;
const EEMPE: u8 = 1 << 2;
const EEPE: u8 = 1 << 1;
const EERE: u8 = 1 << 0;

// UCSR0A
const RXC0: u8 = 1 << 7;
const UDRE0: u8 = 1 << 5;
const FE0: u8 = 1 << 4;
const DOR0: u8 = 1 << 3;
const UPE0: u8 = 1 << 2;
const U2X0: u8 = 1 << 1;
// UCSR0B
const RXCIE0: u8 = 1 << 7;
const TXCIE0: u8 = 1 << 6;
const RXEN0: u8 = 1 << 4;
const TXEN0: u8 = 1 << 3;
// UCSR0C
const UCSZ_8BIT: u8 = 0x06;

// TCCR0A / TIMSK0
const WGM01: u8 = 1 << 1;
const OCIE0A: u8 = 1 << 1;

// SMCR
const SE: u8 = 1 << 0;

/// ADC with AVcc reference, clk/64 and the conversion-complete interrupt.
pub struct AvrAdc {
    _private: (),
}

impl AvrAdc {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn regs(&self) -> &avr_device::atmega328p::adc::RegisterBlock {
        unsafe { &*ADC::ptr() }
    }
}

impl AdcPort for AvrAdc {
    fn configure(&mut self) {
        let adc = self.regs();
        unsafe {
            adc.admux.modify(|r, w| w.bits(r.bits() | REFS0));
            // digital input buffers off on ADC0..ADC5
            adc.didr0.write(|w| w.bits(0x3F));
            adc.adcsra.modify(|r, w| w.bits(r.bits() | ADPS_DIV64 | ADIE));
        }
    }

    fn select(&mut self, channel: u8) {
        unsafe {
            self.regs()
                .admux
                .modify(|r, w| w.bits((r.bits() & !MUX_MASK) | (channel & MUX_MASK)));
        }
    }

    fn start_conversion(&mut self) {
        unsafe {
            self.regs().adcsra.modify(|r, w| w.bits(r.bits() | ADSC));
        }
    }

    fn result(&mut self) -> u16 {
        self.regs().adc.read().bits()
    }

    fn set_enabled(&mut self, enabled: bool) {
        unsafe {
            self.regs().adcsra.modify(|r, w| {
                if enabled {
                    w.bits(r.bits() | ADEN)
                } else {
                    w.bits(r.bits() & !ADEN)
                }
            });
        }
    }
}

/// On-chip EEPROM.
pub struct AvrEeprom {
    _private: (),
}

impl AvrEeprom {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn regs(&self) -> &avr_device::atmega328p::eeprom::RegisterBlock {
        unsafe { &*EEPROM::ptr() }
    }
}

impl EepromPort for AvrEeprom {
    fn write_byte(&mut self, address: u16, byte: u8) {
        let eeprom = self.regs();
        unsafe {
            eeprom.eear.write(|w| w.bits(address));
            eeprom.eedr.write(|w| w.bits(byte));
            // EEPE has to follow EEMPE within four cycles: plain stores only
            let keep = eeprom.eecr.read().bits() & EERIE;
            eeprom.eecr.write(|w| w.bits(keep | EEMPE));
            eeprom.eecr.write(|w| w.bits(keep | EEMPE | EEPE));
        }
    }

    fn read_byte(&mut self, address: u16) -> u8 {
        let eeprom = self.regs();
        while eeprom.eecr.read().bits() & EEPE != 0 {}
        unsafe {
            eeprom.eear.write(|w| w.bits(address));
            eeprom.eecr.modify(|r, w| w.bits(r.bits() | EERE));
        }
        eeprom.eedr.read().bits()
    }

    fn set_ready_interrupt(&mut self, enabled: bool) {
        unsafe {
            self.regs().eecr.modify(|r, w| {
                if enabled {
                    w.bits(r.bits() | EERIE)
                } else {
                    w.bits(r.bits() & !EERIE)
                }
            });
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsartError {
    Framing,
    Overrun,
    Parity,
}

/// USART0 driven by the RX-complete and TX-complete interrupts.
pub struct AvrUsart {
    _private: (),
}

impl AvrUsart {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn regs(&self) -> &avr_device::atmega328p::usart0::RegisterBlock {
        unsafe { &*USART0::ptr() }
    }
}

impl serial::Read<u8> for AvrUsart {
    type Error = UsartError;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        let usart = self.regs();
        // status must be sampled before UDR0 is read
        let status = usart.ucsr0a.read().bits();
        if status & RXC0 == 0 {
            return Err(nb::Error::WouldBlock);
        }
        let byte = usart.udr0.read().bits();
        if status & FE0 != 0 {
            Err(nb::Error::Other(UsartError::Framing))
        } else if status & DOR0 != 0 {
            Err(nb::Error::Other(UsartError::Overrun))
        } else if status & UPE0 != 0 {
            Err(nb::Error::Other(UsartError::Parity))
        } else {
            Ok(byte)
        }
    }
}

impl serial::Write<u8> for AvrUsart {
    type Error = UsartError;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        let usart = self.regs();
        if usart.ucsr0a.read().bits() & UDRE0 == 0 {
            return Err(nb::Error::WouldBlock);
        }
        unsafe {
            usart.udr0.write(|w| w.bits(byte));
        }
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if self.regs().ucsr0a.read().bits() & UDRE0 == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}

impl UsartPort for AvrUsart {
    fn configure(&mut self, settings: &LinkSettings) {
        let usart = self.regs();
        let data_bits = if settings.data_bits == 8 { UCSZ_8BIT } else { 0 };
        unsafe {
            usart.ubrr0.write(|w| w.bits(settings.ubrr));
            usart
                .ucsr0a
                .write(|w| w.bits(if settings.double_speed { U2X0 } else { 0 }));
            usart.ucsr0c.write(|w| w.bits(data_bits));
            usart
                .ucsr0b
                .write(|w| w.bits(RXCIE0 | TXCIE0 | RXEN0 | TXEN0));
        }
    }
}

/// INT0 (PD2) and INT1 (PD3).
pub struct AvrExtInt {
    _private: (),
}

impl AvrExtInt {
    pub const fn new() -> Self {
        Self { _private: () }
    }

    fn regs(&self) -> &avr_device::atmega328p::exint::RegisterBlock {
        unsafe { &*EXINT::ptr() }
    }
}

impl ExtIntPort for AvrExtInt {
    fn enable(&mut self, line: Line, edge: Edge) {
        let shift = 2 * line as u8;
        let sense = match edge {
            Edge::Falling => 0b10,
            Edge::Rising => 0b11,
        };
        let exint = self.regs();
        unsafe {
            exint
                .eicra
                .modify(|r, w| w.bits((r.bits() & !(0b11 << shift)) | (sense << shift)));
            exint.eimsk.modify(|r, w| w.bits(r.bits() | (1 << line as u8)));
        }
    }

    fn disable(&mut self, line: Line) {
        unsafe {
            self.regs()
                .eimsk
                .modify(|r, w| w.bits(r.bits() & !(1 << line as u8)));
        }
    }
}

/// Timer0 in CTC mode as the millisecond tick.
pub struct AvrTimer0 {
    _private: (),
}

impl AvrTimer0 {
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl TickTimer for AvrTimer0 {
    fn configure_millisecond_tick(&mut self, top: u8) {
        let tc0 = unsafe { &*TC0::ptr() };
        unsafe {
            tc0.ocr0a.write(|w| w.bits(top));
            tc0.timsk0.write(|w| w.bits(OCIE0A));
            tc0.tccr0a.write(|w| w.bits(WGM01));
            tc0.tccr0b.write(|w| w.bits(Prescaler::Div64 as u8));
        }
    }
}

/// Idle sleep until the next interrupt.
pub fn sleep_idle() {
    let cpu = unsafe { &*CPU::ptr() };
    unsafe {
        cpu.smcr.write(|w| w.bits(SE));
    }
    avr_device::asm::sleep();
    unsafe {
        cpu.smcr.write(|w| w.bits(0));
    }
}
