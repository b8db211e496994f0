//! Multi-consumer cloning with shared history.
//!
//! The first `clone_stream` on a source installs a [`History`] in its
//! destination slot; every clone replays the history at its own position
//! and the history lazily reads the source on behalf of whichever clone
//! first demands a new position. Ownership is arranged to avoid `Rc`
//! cycles: the slot holds the history strongly, the history holds the
//! source and its clones weakly.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::Value;

use rill_core::events::{EventKind, ListenerId};
use rill_core::state::State;
use rill_core::Result;

use crate::base::Core;
use crate::traits::{Stream, StreamRef};

/// The replay log shared by every clone of one source.
pub struct History<T: 'static> {
    items: RefCell<Vec<T>>,
    clones: RefCell<Option<Vec<Weak<CloneStream<T>>>>>,
    source: Weak<dyn Stream<T>>,
    source_ended: Cell<bool>,
    listener_ids: Cell<Option<(ListenerId, ListenerId, ListenerId)>>,
}

impl<T: Clone + 'static> History<T> {
    fn new(source: &StreamRef<T>) -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(Vec::new()),
            clones: RefCell::new(Some(Vec::new())),
            source: source.core().me(),
            source_ended: Cell::new(source.done()),
            listener_ids: Cell::new(None),
        })
    }

    fn subscribe(self: &Rc<Self>, source: &StreamRef<T>) {
        let weak = Rc::downgrade(self);
        let readable_id = source.on_readable(Box::new({
            let weak = weak.clone();
            move || {
                if let Some(history) = weak.upgrade() {
                    history.each_clone(|clone| clone.core.set_readable(true));
                }
            }
        }));
        let end_id = source.on_end(Box::new({
            let weak = weak.clone();
            move || {
                if let Some(history) = weak.upgrade() {
                    history.on_source_end();
                }
            }
        }));
        let error_id = source.on_error(Box::new(move |err| {
            if let Some(history) = weak.upgrade() {
                let err = err.clone();
                history.each_clone(move |clone| clone.core.emit_error(&err));
            }
        }));
        self.listener_ids
            .set(Some((readable_id, end_id, error_id)));
    }

    fn each_clone(&self, f: impl Fn(&Rc<CloneStream<T>>)) {
        let live: Vec<Rc<CloneStream<T>>> = match &*self.clones.borrow() {
            Some(clones) => clones.iter().filter_map(Weak::upgrade).collect(),
            None => Vec::new(),
        };
        for clone in live {
            f(&clone);
        }
    }

    fn register(&self, clone: &Rc<CloneStream<T>>) {
        if let Some(clones) = self.clones.borrow_mut().as_mut() {
            clones.push(Rc::downgrade(clone));
        }
    }

    fn unregister(&self, clone: &Weak<CloneStream<T>>) {
        if let Some(clones) = self.clones.borrow_mut().as_mut() {
            clones.retain(|entry| !entry.ptr_eq(clone) && entry.upgrade().is_some());
        }
    }

    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Item at `pos`, replayed from the log or read lazily from the
    /// source and appended.
    fn read_at(&self, pos: usize) -> Option<T> {
        {
            let items = self.items.borrow();
            if pos < items.len() {
                return Some(items[pos].clone());
            }
        }
        if self.source_ended.get() {
            return None;
        }
        let source = self.source.upgrade()?;
        let item = source.read()?;
        self.items.borrow_mut().push(item.clone());
        Some(item)
    }

    /// Whether `pos` sits exactly at the end of a finished source.
    fn ends_at(&self, pos: usize) -> bool {
        self.source_ended.get() && self.len() == pos
    }

    /// Source ended: close the clones that have caught up, drop the
    /// registry (no further registrations), free the slot, unsubscribe.
    fn on_source_end(&self) {
        self.source_ended.set(true);
        let at_end = self.len();
        let clones = self.clones.borrow_mut().take();
        if let Some(clones) = clones {
            for clone in clones.iter().filter_map(Weak::upgrade) {
                if clone.position.get() == at_end {
                    clone.close();
                }
            }
        }
        if let Some(source) = self.source.upgrade() {
            source.core().release_destination();
            if let Some((readable_id, end_id, error_id)) = self.listener_ids.take() {
                source.off(EventKind::Readable, readable_id);
                source.off(EventKind::End, end_id);
                source.off(EventKind::Error, error_id);
            }
        }
    }
}

/// One consumer of a shared history, with an independent read position.
pub struct CloneStream<T: 'static> {
    core: Core<T>,
    history: Rc<History<T>>,
    source: StreamRef<T>,
    position: Cell<usize>,
    weak: Weak<CloneStream<T>>,
}

impl<T: Clone + 'static> Stream<T> for CloneStream<T> {
    fn core(&self) -> &Core<T> {
        &self.core
    }

    fn read(&self) -> Option<T> {
        if self.core.state().is_done() {
            return None;
        }
        let pos = self.position.get();
        let item = self.history.read_at(pos);
        match &item {
            Some(_) => self.position.set(pos + 1),
            None => self.core.set_readable(false),
        }
        if self.history.ends_at(self.position.get()) {
            self.close();
        }
        item
    }

    /// Unregister only; the source stays alive for sibling clones.
    fn on_ending(&self, _destroyed: bool) {
        self.history.unregister(&self.weak);
    }

    // Property lookup falls back to the source when the clone itself has
    // no value for the name.

    fn get_property(&self, name: &str) -> Option<Value> {
        self.core
            .properties()
            .get(name)
            .or_else(|| self.source.get_property(name))
    }

    fn get_property_with(&self, name: &str, cb: Box<dyn FnOnce(Value)>) {
        if self.core.properties().get(name).is_some() {
            self.core.properties().get_with(name, cb);
        } else {
            self.source.get_property_with(name, cb);
        }
    }

    fn properties(&self) -> HashMap<String, Value> {
        let mut merged = self.source.properties();
        merged.extend(self.core.properties().snapshot());
        merged
    }
}

/// Register a new clone of `source`, installing the shared history on
/// first use. Fails when the source is already piped into a transform.
/// Cloning a finished source yields an immediately-closed clone.
pub fn clone_stream<T: Clone + 'static>(source: &StreamRef<T>) -> Result<StreamRef<T>> {
    let history = match source.core().destination_history() {
        Some(history) => history,
        None => {
            let history = History::new(source);
            if !source.done() {
                source.core().attach_history(Rc::clone(&history))?;
                history.subscribe(source);
            }
            history
        }
    };
    let clone: Rc<CloneStream<T>> = Rc::new_cyclic(|weak: &Weak<CloneStream<T>>| {
        let me: Weak<dyn Stream<T>> = weak.clone();
        CloneStream {
            core: Core::new(me, State::Open),
            history: Rc::clone(&history),
            source: source.clone(),
            position: Cell::new(0),
            weak: weak.clone(),
        }
    });
    history.register(&clone);
    if source.done() && history.len() == 0 {
        clone.close();
    } else if source.readable() || history.len() > 0 {
        clone.core.set_readable(true);
    }
    Ok(clone)
}
