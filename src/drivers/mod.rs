pub mod serial_console;
pub mod tachometer;

pub use serial_console::SerialConsole;
pub use tachometer::Tachometer;
