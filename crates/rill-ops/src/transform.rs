//! Shared transform plumbing: the asynchronous per-item handle and the
//! adjunct drain used by prepend/append.

use std::cell::Cell;
use std::rc::Rc;

use rill_core::task::Signal;
use rill_stream::{Sink, StreamRef};

/// Handle given to an asynchronous transform callback for one source item.
///
/// The callback pushes any number of output items, then settles the item
/// with [`TransformHandle::done`], which consumes the handle, so a transform
/// cannot settle twice. Dropping the handle without calling `done` stalls
/// the stream.
pub struct TransformHandle<D: 'static> {
    sink: Sink<D>,
    count: usize,
    round: Signal,
    original: Option<D>,
    pushed_before: usize,
}

impl<D: 'static> TransformHandle<D> {
    pub(crate) fn new(sink: Sink<D>, count: usize, round: Signal, original: Option<D>) -> Self {
        let pushed_before = sink.pushed();
        Self {
            sink,
            count,
            round,
            original,
            pushed_before,
        }
    }

    /// Emit one output item for the current source item.
    pub fn push(&self, item: D) {
        self.sink.push(item);
    }

    /// Settle the item. Under the optional rule, a transform that pushed
    /// nothing substitutes the original item. Production then resumes on
    /// the task queue.
    pub fn done(self) {
        if let Some(original) = self.original {
            if self.sink.pushed() == self.pushed_before {
                self.sink.push(original);
            }
        }
        self.sink.resume(self.count, self.round);
    }
}

/// Drive an adjunct stream (prepender or appender) into `sink` via flow
/// mode, firing `done` once it ends. An already-finished adjunct settles
/// immediately.
pub(crate) fn drain_adjunct<D: Clone + 'static>(
    adjunct: StreamRef<D>,
    sink: &Sink<D>,
    done: Signal,
) {
    if adjunct.done() {
        done.fire();
        return;
    }
    let push_sink = sink.clone();
    adjunct.on_data(Box::new(move |item: &D| push_sink.push(item.clone())));
    // The end listener fires at most once; the cell makes the one-shot
    // signal callable from a FnMut.
    let parked = Rc::new(Cell::new(Some(done)));
    adjunct.on_end(Box::new(move || {
        if let Some(done) = parked.take() {
            done.fire();
        }
    }));
}
