//! Configuration constants for the IMOS controller firmware

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 11_059_200;

/// UART baud rate
pub const UART_BAUD: u32 = 9600;

/// UBRR value for `UART_BAUD` with the double-speed bit set
pub const UART_UBRR: u16 = (CPU_FREQ_HZ / (8 * UART_BAUD) - 1) as u16;

/// Depth of each serial queue (transmit and receive)
pub const SERIAL_QUEUE_DEPTH: usize = 128;

/// Number of scanned analog channels (ADC0..ADC5 on the DIP package)
pub const ADC_CHANNELS: usize = 6;

/// Samples kept per analog channel for averaging
pub const ADC_SAMPLE_DEPTH: usize = 8;

/// EEPROM size in bytes
pub const EEPROM_SIZE: usize = 1024;

/// Maximum number of live scheduler events
pub const MAX_EVENTS: usize = 20;

/// Milliseconds per second counter step
pub const MS_PER_SECOND: u32 = 1000;

/// Compare value for a 1ms Timer0 period at clk/64
pub const TICK_TIMER_TOP: u8 = ((CPU_FREQ_HZ / 64 + 500) / 1000 - 1) as u8;

/// Tachometer sampling window in milliseconds
pub const TACHOMETER_WINDOW_MS: u16 = 240;
