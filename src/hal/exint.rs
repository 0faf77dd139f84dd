//! External interrupt lines (INT0/INT1) dispatched to swappable handlers

use crate::rtos::Callback;
use core::cell::{Cell, RefCell};
use critical_section::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    Int0 = 0,
    Int1 = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    Falling,
    Rising,
}

/// Register-level control of the external interrupt lines.
pub trait ExtIntPort {
    fn enable(&mut self, line: Line, edge: Edge);
    fn disable(&mut self, line: Line);
}

/// One handler slot per line, each starting out as [`Callback::NOOP`].
///
/// Slots are written only by [`SignalDispatch::bind`] in the foreground and
/// read by [`SignalDispatch::on_interrupt`]. The interrupt copies the slot
/// before invoking it, so a rebinding applies from the next edge on.
pub struct SignalDispatch<'a, P> {
    port: Mutex<RefCell<P>>,
    slots: [Mutex<Cell<Callback<'a>>>; 2],
}

impl<'a, P: ExtIntPort> SignalDispatch<'a, P> {
    pub const fn new(port: P) -> Self {
        Self {
            port: Mutex::new(RefCell::new(port)),
            slots: [
                Mutex::new(Cell::new(Callback::NOOP)),
                Mutex::new(Cell::new(Callback::NOOP)),
            ],
        }
    }

    /// Attach `handler` to `line` on the falling edge, or detach with `None`.
    pub fn bind(&self, line: Line, handler: Option<Callback<'a>>) {
        critical_section::with(|cs| {
            let slot = self.slots[line as usize].borrow(cs);
            let mut port = self.port.borrow_ref_mut(cs);
            match handler {
                Some(handler) => {
                    slot.set(handler);
                    port.enable(line, Edge::Falling);
                }
                None => {
                    port.disable(line);
                    slot.set(Callback::NOOP);
                }
            }
        });
        debug!("signal line {} rebound", line);
    }

    /// Interrupt body for `line`.
    #[inline]
    pub fn on_interrupt(&self, line: Line) {
        let handler = critical_section::with(|cs| self.slots[line as usize].borrow(cs).get());
        handler.invoke();
    }
}
