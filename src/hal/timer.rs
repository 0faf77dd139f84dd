//! Millisecond tick timer setup

/// Clock prescaler select values shared by the 8-bit timers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div64 = 3,
    Div256 = 4,
    Div1024 = 5,
}

/// A hardware timer able to raise one interrupt per millisecond.
pub trait TickTimer {
    /// Run in clear-on-compare mode at clk/64, interrupting every `top + 1`
    /// counts.
    fn configure_millisecond_tick(&mut self, top: u8);
}
