//! Interrupt-driven duplex USART driver
//!
//! Two independent circular byte queues. The transmit-complete interrupt
//! drains the transmit queue one byte at a time; the receive interrupt
//! appends arriving bytes to the receive queue. Neither queue pushes back on
//! its producer: when a queue is full the oldest byte is overwritten.

use crate::config::{SERIAL_QUEUE_DEPTH, UART_BAUD, UART_UBRR};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::serial;

/// Fixed link parameters applied once by [`Serial::configure`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud: u32,
    pub ubrr: u16,
    pub double_speed: bool,
    pub data_bits: u8,
}

/// 9600 8N1 with the double-speed divider.
pub const LINK: LinkSettings = LinkSettings {
    baud: UART_BAUD,
    ubrr: UART_UBRR,
    double_speed: true,
    data_bits: 8,
};

/// A USART data register plus its one-time setup.
pub trait UsartPort: serial::Read<u8> + serial::Write<u8> {
    /// Apply link settings and enable RX/TX with both completion interrupts.
    fn configure(&mut self, settings: &LinkSettings);
}

/// Fixed-depth circular byte buffer. `head == tail` means empty, so at most
/// `N - 1` bytes are held; pushing into a full queue drops the oldest byte.
pub struct ByteQueue<const N: usize> {
    data: [u8; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> ByteQueue<N> {
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            head: 0,
            tail: 0,
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.data[self.head] = byte;
        self.head = (self.head + 1) % N;
        if self.head == self.tail {
            self.tail = (self.tail + 1) % N;
        }
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        let byte = self.data[self.tail];
        self.tail = (self.tail + 1) % N;
        Some(byte)
    }

    /// Oldest byte, left in place.
    pub fn peek(&self) -> Option<u8> {
        if self.head == self.tail {
            return None;
        }
        Some(self.data[self.tail])
    }

    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

struct SerialState<U> {
    port: U,
    tx: ByteQueue<SERIAL_QUEUE_DEPTH>,
    rx: ByteQueue<SERIAL_QUEUE_DEPTH>,
    sending: bool,
}

impl<U: UsartPort> SerialState<U> {
    fn pop_tx(&mut self) -> Option<u8> {
        self.tx.pop()
    }

    // Put the next queued byte on the wire, or go idle. A byte leaves the
    // queue only once the port took it; a busy port keeps it for the next
    // push or completion interrupt.
    fn send_next(&mut self) {
        while let Some(byte) = self.tx.peek() {
            match self.port.write(byte) {
                Ok(()) => {
                    self.pop_tx();
                    self.sending = true;
                    return;
                }
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    warn!("USART transmit failed, byte dropped");
                    self.pop_tx();
                }
            }
        }
        self.sending = false;
    }
}

pub struct Serial<U> {
    state: Mutex<RefCell<SerialState<U>>>,
}

impl<U: UsartPort> Serial<U> {
    pub const fn new(port: U) -> Self {
        Self {
            state: Mutex::new(RefCell::new(SerialState {
                port,
                tx: ByteQueue::new(),
                rx: ByteQueue::new(),
                sending: false,
            })),
        }
    }

    pub fn configure(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).port.configure(&LINK));
        debug!("USART configured at {=u32} baud", LINK.baud);
    }

    /// Queue a byte; starts a transmission if the line is idle.
    pub fn push_tx(&self, byte: u8) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.tx.push(byte);
            if !state.sending {
                state.send_next();
            }
        });
    }

    /// Queue every byte of `bytes` in order.
    pub fn send_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.push_tx(byte);
        }
    }

    /// Queue `text` up to (not including) the first NUL byte.
    pub fn send_string(&self, text: &str) {
        for byte in text.bytes().take_while(|&b| b != 0) {
            self.push_tx(byte);
        }
    }

    /// Oldest received byte, or `None` when nothing is pending.
    pub fn pop_rx(&self) -> Option<u8> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).rx.pop())
    }

    pub fn rx_pending(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).rx.len())
    }

    pub fn is_transmitting(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).sending)
    }

    /// Receive-complete interrupt body.
    pub fn on_receive(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            match state.port.read() {
                Ok(byte) => state.rx.push(byte),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(_)) => warn!("USART receive error"),
            }
        });
    }

    /// Transmit-complete interrupt body.
    pub fn on_transmit_complete(&self) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).send_next());
    }
}
