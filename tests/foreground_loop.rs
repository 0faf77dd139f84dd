//! Drives the whole driver set the way the firmware does: interrupt bodies
//! are called by hand between foreground steps.

use embedded_hal::serial;
use embedded_hal_mock::serial::{Mock, Transaction};
use embedded_hal_mock::MockError;
use imos_firmware::config::{ADC_CHANNELS, EEPROM_SIZE, TACHOMETER_WINDOW_MS, TICK_TIMER_TOP};
use imos_firmware::drivers::{SerialConsole, Tachometer};
use imos_firmware::hal::{
    AdcPort, Edge, EepromPort, ExtIntPort, Hal, Line, LinkSettings, NvError, TickTimer, UsartPort,
    LINK,
};
use imos_firmware::rtos::{Callback, Handler, Scheduler, SystemClock};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
struct Board {
    adc_channel: u8,
    adc_enabled: bool,
    adc_conversions: u32,
    eeprom: Vec<u8>,
    eeprom_irq: bool,
    link: Option<LinkSettings>,
    lines: [bool; 2],
    timer_top: Option<u8>,
}

type Shared = Rc<RefCell<Board>>;

struct Adc(Shared);

impl AdcPort for Adc {
    fn configure(&mut self) {}

    fn select(&mut self, channel: u8) {
        self.0.borrow_mut().adc_channel = channel;
    }

    fn start_conversion(&mut self) {
        self.0.borrow_mut().adc_conversions += 1;
    }

    // every channel reads a constant 100 * (channel + 1)
    fn result(&mut self) -> u16 {
        100 * (u16::from(self.0.borrow().adc_channel) + 1)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.0.borrow_mut().adc_enabled = enabled;
    }
}

struct Eeprom(Shared);

impl EepromPort for Eeprom {
    fn write_byte(&mut self, address: u16, byte: u8) {
        self.0.borrow_mut().eeprom[usize::from(address)] = byte;
    }

    fn read_byte(&mut self, address: u16) -> u8 {
        self.0.borrow().eeprom[usize::from(address)]
    }

    fn set_ready_interrupt(&mut self, enabled: bool) {
        self.0.borrow_mut().eeprom_irq = enabled;
    }
}

struct Usart(Mock<u8>, Shared);

impl serial::Read<u8> for Usart {
    type Error = MockError;

    fn read(&mut self) -> nb::Result<u8, MockError> {
        self.0.read()
    }
}

impl serial::Write<u8> for Usart {
    type Error = MockError;

    fn write(&mut self, byte: u8) -> nb::Result<(), MockError> {
        self.0.write(byte)
    }

    fn flush(&mut self) -> nb::Result<(), MockError> {
        self.0.flush()
    }
}

impl UsartPort for Usart {
    fn configure(&mut self, settings: &LinkSettings) {
        self.1.borrow_mut().link = Some(*settings);
    }
}

struct Pins(Shared);

impl ExtIntPort for Pins {
    fn enable(&mut self, line: Line, edge: Edge) {
        assert_eq!(edge, Edge::Falling);
        self.0.borrow_mut().lines[line as usize] = true;
    }

    fn disable(&mut self, line: Line) {
        self.0.borrow_mut().lines[line as usize] = false;
    }
}

struct Timer(Shared);

impl TickTimer for Timer {
    fn configure_millisecond_tick(&mut self, top: u8) {
        self.0.borrow_mut().timer_top = Some(top);
    }
}

type TestHal<'a> = Hal<'a, Adc, Eeprom, Usart, Pins, Timer>;

fn build<'a>(transactions: &[Transaction<u8>]) -> (Shared, Mock<u8>, TestHal<'a>) {
    let board: Shared = Rc::new(RefCell::new(Board {
        eeprom: vec![0xFF; EEPROM_SIZE],
        ..Board::default()
    }));
    let mock = Mock::new(transactions);
    let hal = Hal::new(
        Adc(board.clone()),
        Eeprom(board.clone()),
        Usart(mock.clone(), board.clone()),
        Pins(board.clone()),
        Timer(board.clone()),
    );
    (board, mock, hal)
}

/// One millisecond of hardware activity followed by a foreground pass.
fn step(hal: &TestHal<'_>, scheduler: &mut Scheduler<'_, SystemClock>) {
    hal.clock.tick();
    for _ in 0..ADC_CHANNELS {
        hal.sampler.on_conversion_complete();
    }
    hal.eeprom.on_ready();
    scheduler.refresh();
}

#[derive(Default)]
struct Beat(AtomicU32);

impl Handler for Beat {
    fn handle(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

#[test]
fn start_configures_every_peripheral() {
    let (board, mut mock, hal) = build(&[]);
    hal.start();

    let b = board.borrow();
    assert!(b.adc_enabled);
    assert_eq!(b.adc_channel, 0);
    assert_eq!(b.adc_conversions, 1);
    assert_eq!(b.link, Some(LINK));
    assert_eq!(b.timer_top, Some(TICK_TIMER_TOP));
    assert_eq!(hal.now_ms(), 0);
    drop(b);
    mock.done();
}

#[test]
fn scheduler_and_sampler_share_the_tick() {
    let beat = Beat::default();
    let (_board, mut mock, hal) = build(&[]);
    hal.start();

    let mut scheduler = Scheduler::new(&hal.clock);
    scheduler.register(250, &beat).unwrap();

    for _ in 0..1_000 {
        step(&hal, &mut scheduler);
    }
    assert_eq!(hal.now_ms(), 1_000);
    assert_eq!(hal.now_s(), 1);
    assert_eq!(beat.0.load(Ordering::Relaxed), 4);

    for channel in 0..ADC_CHANNELS {
        assert_eq!(hal.sampler.read(channel), Ok(100 * (channel as u16 + 1)));
    }
    mock.done();
}

#[test]
fn tachometer_counts_through_the_signal_line() {
    let tacho = Tachometer::new();
    let (board, mut mock, hal) = build(&[]);
    hal.start();

    let mut scheduler = Scheduler::new(&hal.clock);
    let id = tacho.attach(&mut scheduler, &hal.signals).unwrap();
    assert!(board.borrow().lines[Line::Int1 as usize]);

    for _ in 0..8 {
        for _ in 0..10 {
            hal.signals.on_interrupt(Line::Int1);
        }
        for _ in 0..TACHOMETER_WINDOW_MS {
            step(&hal, &mut scheduler);
        }
    }
    assert_eq!(tacho.rpm(), 80 * 31);

    tacho.detach(id, &mut scheduler, &hal.signals).unwrap();
    assert!(!board.borrow().lines[Line::Int1 as usize]);
    mock.done();
}

#[test]
fn configuration_survives_in_eeprom() {
    static CONFIG: [u8; 6] = [1, b'8', b'0', b'8', b'0', 0];
    let (board, mut mock, hal) = build(&[]);
    hal.start();
    let mut scheduler = Scheduler::new(&hal.clock);

    assert_eq!(hal.eeprom.write(32, &CONFIG), Ok(38));
    assert!(board.borrow().eeprom_irq);
    let mut copy = [0u8; 6];
    assert_eq!(hal.eeprom.read(32, &mut copy), Err(NvError::Busy));

    while hal.eeprom.is_busy() {
        step(&hal, &mut scheduler);
    }
    assert!(!board.borrow().eeprom_irq);
    assert_eq!(hal.eeprom.read(32, &mut copy), Ok(38));
    assert_eq!(copy, CONFIG);
    mock.done();
}

#[test]
fn low_power_suspends_the_scan() {
    let (board, mut mock, hal) = build(&[]);
    hal.start();

    hal.enter_low_power();
    assert!(!board.borrow().adc_enabled);
    let conversions = board.borrow().adc_conversions;
    hal.sampler.on_conversion_complete();
    assert_eq!(board.borrow().adc_conversions, conversions);

    hal.leave_low_power();
    assert!(board.borrow().adc_enabled);
    assert_eq!(board.borrow().adc_conversions, conversions + 1);
    mock.done();
}

#[test]
fn console_echoes_received_bytes() {
    let (_board, mut mock, hal) = build(&[
        Transaction::read(b'h'),
        Transaction::read(b'i'),
        Transaction::write(b'h'),
        Transaction::write(b'i'),
    ]);
    hal.start();
    hal.serial.on_receive();
    hal.serial.on_receive();

    let mut console = SerialConsole::new(&hal.serial);
    while let Some(byte) = console.read_byte() {
        console.write_byte(byte);
    }
    while hal.serial.is_transmitting() {
        hal.serial.on_transmit_complete();
    }
    mock.done();
}

#[test]
fn unbound_line_ignores_edges() {
    let beat = Beat::default();
    let (_board, mut mock, hal) = build(&[]);
    hal.signals.bind(Line::Int0, Some(Callback::from(&beat)));
    hal.signals.bind(Line::Int0, None);
    hal.signals.on_interrupt(Line::Int0);
    assert_eq!(beat.0.load(Ordering::Relaxed), 0);
    mock.done();
}
