//! The stream contract.
//!
//! `Stream<T>` is object-safe on purpose: pipelines hold `StreamRef<T>`
//! (`Rc<dyn Stream<T>>`) handles and dispatch dynamically, the way every
//! layer of the tower consumes the layer below it. Concrete producers
//! override `read` and the lifecycle hooks; everything else has a default
//! routed through the embedded [`Core`].

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use rill_core::events::{EventKind, ListenerId};
use rill_core::state::State;
use rill_core::task::Signal;
use rill_core::{task, Error};

use crate::base::Core;

/// Shared handle to a stream.
pub type StreamRef<T> = Rc<dyn Stream<T>>;

pub trait Stream<T: 'static>: 'static {
    fn core(&self) -> &Core<T>;

    /// Pull one item. `None` means "nothing available right now" and never
    /// distinguishes end-of-stream from temporary emptiness; consumers use
    /// [`Stream::done`] for that.
    fn read(&self) -> Option<T> {
        None
    }

    /// Request graceful termination: pending items are still delivered,
    /// then `end` fires. Idempotent.
    fn close(&self) {
        let core = self.core();
        if core.change_state(State::Closed) {
            core.defer_finish(false);
        }
    }

    /// Force termination, discarding anything buffered. No `end` is
    /// emitted on this path.
    fn destroy(&self) {
        self.destroy_with(None)
    }

    /// Destroy with a cause; the cause is emitted as a single `error`
    /// event before the DESTROYED transition.
    fn destroy_with(&self, cause: Option<Error>) {
        let core = self.core();
        if core.state().is_done() {
            return;
        }
        let me = core.me();
        let for_emit = cause.clone();
        let done = Signal::new(move || {
            if let Some(stream) = me.upgrade() {
                if let Some(cause) = &for_emit {
                    stream.core().emit_error(cause);
                }
                finish(&stream, true);
            }
        });
        self.on_destroy(cause.as_ref(), done);
    }

    /// Subclass teardown for the destroy path. Must fire `done` exactly
    /// once (enforced by [`Signal`] ownership).
    fn on_destroy(&self, cause: Option<&Error>, done: Signal) {
        let _ = cause;
        done.fire();
    }

    /// Subclass teardown for the terminal transition, graceful or not.
    /// Runs before listeners are released, so unsubscribing still works.
    fn on_ending(&self, destroyed: bool) {
        let _ = destroyed;
    }

    // ----- state accessors -----

    fn state(&self) -> State {
        self.core().state()
    }

    /// Conservative hint: `true` means "try reading", `false` means "do
    /// not bother yet".
    fn readable(&self) -> bool {
        self.core().readable()
    }

    fn closed(&self) -> bool {
        self.core().state().is_closed()
    }

    fn ended(&self) -> bool {
        self.core().state() == State::Ended
    }

    fn destroyed(&self) -> bool {
        self.core().state() == State::Destroyed
    }

    fn done(&self) -> bool {
        self.core().state().is_done()
    }

    // ----- events -----

    fn on_readable(&self, f: Box<dyn FnMut()>) -> ListenerId {
        self.core().events().on_readable(f)
    }

    /// Attaching a `data` listener switches the stream into flow mode.
    fn on_data(&self, f: Box<dyn FnMut(&T)>) -> ListenerId {
        self.core().events().on_data(f)
    }

    fn on_end(&self, f: Box<dyn FnMut()>) -> ListenerId {
        self.core().events().on_end(f)
    }

    fn on_error(&self, f: Box<dyn FnMut(&Error)>) -> ListenerId {
        self.core().events().on_error(f)
    }

    fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let removed = self.core().events().off(kind, id);
        self.core().maybe_rearm();
        removed
    }

    fn has_listeners(&self, kind: EventKind) -> bool {
        self.core().events().has(kind)
    }

    /// Alias for [`Stream::on_data`].
    fn for_each(&self, f: Box<dyn FnMut(&T)>) -> ListenerId {
        self.on_data(f)
    }

    // ----- properties -----

    fn get_property(&self, name: &str) -> Option<Value> {
        self.core().properties().get(name)
    }

    fn get_property_with(&self, name: &str, cb: Box<dyn FnOnce(Value)>) {
        self.core().properties().get_with(name, cb)
    }

    fn set_property(&self, name: &str, value: Value) {
        self.core().properties().set(name, value)
    }

    fn set_properties(&self, entries: HashMap<String, Value>) {
        self.core().properties().set_all(entries)
    }

    fn properties(&self) -> HashMap<String, Value> {
        self.core().properties().snapshot()
    }
}

/// The terminal transition: run subclass teardown, move to ENDED (or
/// DESTROYED), clear readability, emit `end` exactly once on the graceful
/// path, then release `readable`/`data`/`end` listeners.
pub fn finish<T: 'static>(stream: &Rc<dyn Stream<T>>, destroyed: bool) {
    let core = stream.core();
    let target = if destroyed {
        State::Destroyed
    } else {
        State::Ended
    };
    if !core.state().allows(target) {
        return;
    }
    stream.on_ending(destroyed);
    core.change_state(target);
    core.force_unreadable();
    if !destroyed {
        core.events().emit_end();
    }
    core.events().release_terminal();
    core.stop_flow();
}

/// Mirror `names` from `source` onto `dest` as they become available,
/// using the deferred property protocol.
pub fn copy_properties<S: 'static, T: 'static>(
    source: &StreamRef<S>,
    dest: &StreamRef<T>,
    names: &[&str],
) {
    for name in names {
        let weak = dest.core().me();
        let key = name.to_string();
        source.get_property_with(
            name,
            Box::new(move |value| {
                if let Some(dest) = weak.upgrade() {
                    dest.set_property(&key, value);
                }
            }),
        );
    }
}

/// Convenience: gather everything a stream emits into a `Vec`, driving the
/// task queue until the stream ends or stops making progress.
pub fn collect<T: Clone + 'static>(stream: &StreamRef<T>) -> Vec<T> {
    let out = Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = Rc::clone(&out);
    stream.for_each(Box::new(move |item: &T| sink.borrow_mut().push(item.clone())));
    while task::drain() > 0 {}
    let items = out.borrow().clone();
    items
}
