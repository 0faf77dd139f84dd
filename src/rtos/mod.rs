//! Time keeping and cooperative scheduling

pub mod callback;
pub mod clock;
pub mod scheduler;

pub use callback::{Callback, Handler};
pub use clock::{Clock, SystemClock};
pub use scheduler::{EventId, Scheduler, SchedulerError};
