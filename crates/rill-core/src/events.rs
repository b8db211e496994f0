//! Per-stream event dispatch.
//!
//! Each stream carries one listener list per event kind, which keeps the
//! dispatch fully typed: `readable` and `end` listeners take no payload,
//! `data` listeners borrow the item, `error` listeners borrow the error.
//! A `new_listener` meta-hook fires on every attach; the base stream uses
//! it to install the flow-mode switch without any per-item bookkeeping.
//!
//! Emission is reentrancy-safe: a listener may attach or detach listeners
//! on the same stream from inside its callback. Detached listeners are
//! skipped even when the emission that is currently running already
//! snapshotted them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::Error;

/// The events a stream can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Items may now be available; try `read()`.
    Readable,
    /// One item, delivered in flow mode.
    Data,
    /// Terminal: the stream ended gracefully.
    End,
    /// A stream error; does not change state by itself.
    Error,
}

/// Handle for detaching a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// What the `new_listener` hook wants to happen to itself after firing.
pub enum HookAction {
    /// Stay armed for the next attach.
    Keep,
    /// Drop the hook; it will not fire again until re-armed.
    Disarm,
}

type Entry<F> = (u64, Rc<RefCell<Option<Box<F>>>>);

struct Slot<F: ?Sized> {
    entries: RefCell<Vec<Entry<F>>>,
}

impl<F: ?Sized> Slot<F> {
    fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, id: u64, f: Box<F>) {
        self.entries
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(Some(f)))));
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|(eid, _)| *eid == id) {
            Some(idx) => {
                // Emptying the cell makes removal visible to an emission
                // that is mid-flight over a snapshot. A listener removing
                // itself is currently borrowed; dropping the entry is
                // enough in that case, since its invocation already ran.
                let (_, cell) = entries.remove(idx);
                if let Ok(mut listener) = cell.try_borrow_mut() {
                    listener.take();
                }
                true
            }
            None => false,
        }
    }

    fn has(&self) -> bool {
        !self.entries.borrow().is_empty()
    }

    fn clear(&self) {
        for (_, cell) in self.entries.borrow_mut().drain(..) {
            // A listener may trigger the clear from inside its own
            // invocation (destroy from a data callback); its cell is
            // borrowed then and dropping the entry suffices.
            if let Ok(mut listener) = cell.try_borrow_mut() {
                listener.take();
            }
        }
    }

    fn snapshot(&self) -> Vec<Rc<RefCell<Option<Box<F>>>>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, cell)| Rc::clone(cell))
            .collect()
    }
}

/// The event bus owned by every stream core.
pub struct Events<T> {
    readable: Slot<dyn FnMut()>,
    data: Slot<dyn FnMut(&T)>,
    end: Slot<dyn FnMut()>,
    error: Slot<dyn FnMut(&Error)>,
    hook: Cell<Option<Box<dyn FnMut(EventKind) -> HookAction>>>,
    next_id: Cell<u64>,
}

impl<T> Events<T> {
    pub fn new() -> Self {
        Self {
            readable: Slot::new(),
            data: Slot::new(),
            end: Slot::new(),
            error: Slot::new(),
            hook: Cell::new(None),
            next_id: Cell::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    /// Fires after the listener is attached, so the hook observes it.
    fn fire_hook(&self, kind: EventKind) {
        if let Some(mut hook) = self.hook.take() {
            match hook(kind) {
                HookAction::Keep => self.hook.set(Some(hook)),
                HookAction::Disarm => {}
            }
        }
    }

    /// Arm (or replace) the `new_listener` meta-hook.
    pub fn set_hook(&self, hook: Box<dyn FnMut(EventKind) -> HookAction>) {
        self.hook.set(Some(hook));
    }

    pub fn on_readable(&self, f: Box<dyn FnMut()>) -> ListenerId {
        let id = self.next_id();
        self.readable.add(id, f);
        self.fire_hook(EventKind::Readable);
        ListenerId(id)
    }

    pub fn on_data(&self, f: Box<dyn FnMut(&T)>) -> ListenerId {
        let id = self.next_id();
        self.data.add(id, f);
        self.fire_hook(EventKind::Data);
        ListenerId(id)
    }

    pub fn on_end(&self, f: Box<dyn FnMut()>) -> ListenerId {
        let id = self.next_id();
        self.end.add(id, f);
        self.fire_hook(EventKind::End);
        ListenerId(id)
    }

    pub fn on_error(&self, f: Box<dyn FnMut(&Error)>) -> ListenerId {
        let id = self.next_id();
        self.error.add(id, f);
        self.fire_hook(EventKind::Error);
        ListenerId(id)
    }

    /// Detach a listener. Returns whether it was still attached.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        match kind {
            EventKind::Readable => self.readable.remove(id.0),
            EventKind::Data => self.data.remove(id.0),
            EventKind::End => self.end.remove(id.0),
            EventKind::Error => self.error.remove(id.0),
        }
    }

    pub fn has(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Readable => self.readable.has(),
            EventKind::Data => self.data.has(),
            EventKind::End => self.end.has(),
            EventKind::Error => self.error.has(),
        }
    }

    // The emit loops skip listeners whose cell is already borrowed: a
    // listener is never invoked reentrantly from inside itself.

    pub fn emit_readable(&self) {
        for cell in self.readable.snapshot() {
            if let Ok(mut listener) = cell.try_borrow_mut() {
                if let Some(f) = listener.as_mut() {
                    f();
                }
            }
        }
    }

    pub fn emit_data(&self, item: &T) {
        for cell in self.data.snapshot() {
            if let Ok(mut listener) = cell.try_borrow_mut() {
                if let Some(f) = listener.as_mut() {
                    f(item);
                }
            }
        }
    }

    pub fn emit_end(&self) {
        for cell in self.end.snapshot() {
            if let Ok(mut listener) = cell.try_borrow_mut() {
                if let Some(f) = listener.as_mut() {
                    f();
                }
            }
        }
    }

    /// Returns whether any listener received the error, so the caller can
    /// record otherwise-unobserved failures.
    pub fn emit_error(&self, err: &Error) -> bool {
        let snapshot = self.error.snapshot();
        let mut delivered = false;
        for cell in snapshot {
            if let Ok(mut listener) = cell.try_borrow_mut() {
                if let Some(f) = listener.as_mut() {
                    f(err);
                    delivered = true;
                }
            }
        }
        delivered
    }

    /// Drop every `readable`/`data`/`end` listener and the meta-hook.
    /// Invoked when the stream reaches a terminal state; `error` listeners
    /// stay attached.
    pub fn release_terminal(&self) {
        self.readable.clear();
        self.data.clear();
        self.end.clear();
        self.hook.set(None);
    }
}

impl<T> Default for Events<T> {
    fn default() -> Self {
        Self::new()
    }
}
