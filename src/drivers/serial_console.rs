use crate::hal::{Serial, UsartPort};
use core::convert::Infallible;

/// Text front end over the shared serial driver.
///
/// Cheap to create wherever output is needed; it only borrows the driver.
pub struct SerialConsole<'a, U> {
    serial: &'a Serial<U>,
}

impl<'a, U: UsartPort> SerialConsole<'a, U> {
    pub fn new(serial: &'a Serial<U>) -> Self {
        Self { serial }
    }

    pub fn write_str(&mut self, s: &str) {
        self.serial.send_bytes(s.as_bytes());
    }

    pub fn write_line(&mut self, s: &str) {
        self.write_str(s);
        self.write_str("\r\n");
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        self.serial.pop_rx()
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.serial.push_tx(byte);
    }

    // Debug helper - print hex value
    pub fn write_hex(&mut self, val: u8) {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        self.write_byte(HEX_CHARS[(val >> 4) as usize]);
        self.write_byte(HEX_CHARS[(val & 0xF) as usize]);
    }

    // Print formatted debug info
    pub fn debug(&mut self, msg: &str, val: u8) {
        self.write_str("[DBG] ");
        self.write_str(msg);
        self.write_str(": 0x");
        self.write_hex(val);
        self.write_str("\r\n");
    }
}

impl<U: UsartPort> ufmt::uWrite for SerialConsole<'_, U> {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        SerialConsole::write_str(self, s);
        Ok(())
    }
}

impl<U: UsartPort> core::fmt::Write for SerialConsole<'_, U> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        SerialConsole::write_str(self, s);
        Ok(())
    }
}
