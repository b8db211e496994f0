//! The per-stream core: state machine, readable flag, event bus, property
//! bag, destination slot, and flow-mode switching.
//!
//! `Core` is embedded by every concrete stream. It keeps a `Weak` reference
//! to the stream's own trait object so deferred tasks (readable emissions,
//! end transitions, flow drains) can call back through dynamic dispatch
//! without keeping the stream alive.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rill_core::events::{EventKind, Events, HookAction};
use rill_core::state::State;
use rill_core::{task, Error, Properties};

use crate::clone::History;
use crate::traits::{finish, Stream};

/// The destination slot of a source stream.
///
/// A source carries at most one destination: either a single transform
/// (`Piped`) or a shared [`History`] multiplexing any number of clones.
pub(crate) enum Destination<T: 'static> {
    Free,
    Piped,
    Shared(Rc<History<T>>),
}

pub struct Core<T: 'static> {
    state: Cell<State>,
    readable: Cell<bool>,
    readable_pending: Cell<bool>,
    flowing: Cell<bool>,
    events: Events<T>,
    properties: Properties,
    destination: RefCell<Destination<T>>,
    me: Weak<dyn Stream<T>>,
}

impl<T: 'static> Core<T> {
    /// Build a core for the stream `me` points at, starting in `initial`.
    /// Arms the flow-mode hook: the first `data` listener switches the
    /// stream into flow mode.
    pub fn new(me: Weak<dyn Stream<T>>, initial: State) -> Self {
        let core = Self {
            state: Cell::new(initial),
            readable: Cell::new(false),
            readable_pending: Cell::new(false),
            flowing: Cell::new(false),
            events: Events::new(),
            properties: Properties::new(),
            destination: RefCell::new(Destination::Free),
            me,
        };
        core.arm_flow_hook();
        core
    }

    pub fn state(&self) -> State {
        self.state.get()
    }

    /// Forward-only transition; fails silently once terminal.
    pub fn change_state(&self, next: State) -> bool {
        let current = self.state.get();
        if current.allows(next) {
            self.state.set(next);
            #[cfg(feature = "tracing")]
            tracing::trace!(from = ?current, to = ?next, "state transition");
            true
        } else {
            false
        }
    }

    pub fn readable(&self) -> bool {
        self.readable.get()
    }

    /// Coercing setter: a done stream is never readable. A false-to-true
    /// edge schedules a deferred `readable` emission (and, in flow mode, a
    /// drain pass).
    pub fn set_readable(&self, value: bool) {
        let value = value && !self.state().is_done();
        let was = self.readable.replace(value);
        if !was && value && !self.readable_pending.replace(true) {
            let me = self.me.clone();
            task::defer(move || {
                if let Some(stream) = me.upgrade() {
                    let core = stream.core();
                    core.readable_pending.set(false);
                    if core.state().is_done() || !core.readable() {
                        return;
                    }
                    core.events.emit_readable();
                    if core.flowing.get() {
                        flow_drain(&stream);
                    }
                }
            });
        }
    }

    /// Unconditional clear, used on the terminal path.
    pub(crate) fn force_unreadable(&self) {
        self.readable.set(false);
    }

    pub fn events(&self) -> &Events<T> {
        &self.events
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// A clone of the stream's own weak trait-object reference.
    pub fn me(&self) -> Weak<dyn Stream<T>> {
        self.me.clone()
    }

    /// Emit an error to listeners; unobserved errors are recorded, not
    /// raised. Errors do not change state.
    pub fn emit_error(&self, err: &Error) {
        let delivered = self.events.emit_error(err);
        #[cfg(feature = "tracing")]
        if !delivered {
            tracing::warn!(error = %err, "stream error with no listener");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = delivered;
    }

    /// Schedule the terminal transition on the task queue.
    pub(crate) fn defer_finish(&self, destroyed: bool) {
        let me = self.me.clone();
        task::defer(move || {
            if let Some(stream) = me.upgrade() {
                finish(&stream, destroyed);
            }
        });
    }

    pub(crate) fn stop_flow(&self) {
        self.flowing.set(false);
    }

    // ----- flow mode -----

    fn arm_flow_hook(&self) {
        let me = self.me.clone();
        self.events.set_hook(Box::new(move |kind| {
            if kind != EventKind::Data {
                return HookAction::Keep;
            }
            if let Some(stream) = me.upgrade() {
                stream.core().engage_flow();
            }
            HookAction::Disarm
        }));
    }

    fn engage_flow(&self) {
        if self.state().is_done() {
            return;
        }
        self.flowing.set(true);
        if self.readable() {
            let me = self.me.clone();
            task::defer(move || {
                if let Some(stream) = me.upgrade() {
                    flow_drain(&stream);
                }
            });
        }
    }

    /// Called after any listener detach: if flow mode lost its last `data`
    /// listener on a live stream, drop back to on-demand mode and re-arm
    /// the hook.
    pub(crate) fn maybe_rearm(&self) {
        if self.flowing.get() && !self.events.has(EventKind::Data) && !self.state().is_done() {
            self.flowing.set(false);
            self.arm_flow_hook();
        }
    }

    // ----- destination slot -----

    /// Claim this source for a single transform destination.
    pub fn claim_destination(&self) -> Result<(), Error> {
        let mut slot = self.destination.borrow_mut();
        match *slot {
            Destination::Free => {
                *slot = Destination::Piped;
                Ok(())
            }
            _ => Err(Error::AlreadyPiped),
        }
    }

    /// Free the slot again (transform teardown, history release).
    pub fn release_destination(&self) {
        *self.destination.borrow_mut() = Destination::Free;
    }

    /// The shared history, when this source is being cloned.
    pub fn destination_history(&self) -> Option<Rc<History<T>>> {
        match &*self.destination.borrow() {
            Destination::Shared(history) => Some(Rc::clone(history)),
            _ => None,
        }
    }

    /// Install a history in a free slot.
    pub fn attach_history(&self, history: Rc<History<T>>) -> Result<(), Error> {
        let mut slot = self.destination.borrow_mut();
        match *slot {
            Destination::Free => {
                *slot = Destination::Shared(history);
                Ok(())
            }
            _ => Err(Error::AlreadyPiped),
        }
    }
}

/// One flow-mode drain pass: keep reading and emitting `data` while
/// listeners exist and items are available. Runs on the task queue or
/// inside a `readable` emission.
pub(crate) fn flow_drain<T: 'static>(stream: &Rc<dyn Stream<T>>) {
    let core = stream.core();
    while core.flowing.get() && core.events.has(EventKind::Data) {
        match stream.read() {
            Some(item) => core.events.emit_data(&item),
            None => break,
        }
    }
    core.maybe_rearm();
}
