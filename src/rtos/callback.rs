//! Zero-argument callback capability shared by the scheduler and the
//! external signal dispatch.

/// Something that can be invoked with no arguments.
///
/// Implementors keep their own state behind interior mutability, since the
/// scheduler and the interrupt dispatch only ever hold shared references.
/// Handlers are reached from interrupt context, hence `Sync`.
pub trait Handler: Sync {
    fn handle(&self);
}

/// A callable reference: either a plain routine or a handler object.
#[derive(Clone, Copy)]
pub enum Callback<'a> {
    Routine(fn()),
    Object(&'a dyn Handler),
}

fn noop() {}

impl<'a> Callback<'a> {
    /// Does nothing when invoked. Unbound interrupt lines point here.
    pub const NOOP: Callback<'static> = Callback::Routine(noop);

    #[inline]
    pub fn invoke(&self) {
        match self {
            Callback::Routine(routine) => routine(),
            Callback::Object(handler) => handler.handle(),
        }
    }
}

impl From<fn()> for Callback<'_> {
    fn from(routine: fn()) -> Self {
        Callback::Routine(routine)
    }
}

impl<'a, H: Handler> From<&'a H> for Callback<'a> {
    fn from(handler: &'a H) -> Self {
        Callback::Object(handler)
    }
}
