//! Bounded-buffer stream with an asynchronous production protocol.
//!
//! `Buffered` owns the buffer and the lifecycle; a [`Produce`] strategy
//! supplies the items through `begin`/`pull`/`flush` steps, each of which
//! settles through a one-shot [`Signal`]. The `reading` flag is the
//! single-flight lock: it is held from the moment a step is issued until
//! its signal fires, so at most one production callback is ever
//! outstanding. A close that arrives while the lock is held parks in
//! CLOSING and the in-flight signal completes it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use rill_core::state::State;
use rill_core::task::Signal;
use rill_core::{task, Error, StreamConfig};

use crate::base::Core;
use crate::traits::{Stream, StreamRef};

/// Production strategy for a [`Buffered`] stream.
///
/// Every hook receives a [`Sink`] onto its host and a [`Signal`] it must
/// fire exactly once when the step settles, synchronously or after any
/// number of deferred tasks. Dropping a signal without firing it stalls
/// the stream.
pub trait Produce<T: 'static>: 'static {
    /// One-time setup before the stream opens.
    fn begin(&self, sink: &Sink<T>, done: Signal) {
        let _ = sink;
        done.fire();
    }

    /// Produce up to `count` items via `sink.push`. The default produces
    /// nothing, leaving the stream open until someone closes it.
    fn pull(&self, count: usize, sink: &Sink<T>, done: Signal) {
        let _ = (count, sink);
        done.fire();
    }

    /// Final items after close has been requested, before `end`.
    fn flush(&self, sink: &Sink<T>, done: Signal) {
        let _ = sink;
        done.fire();
    }

    /// Teardown on the terminal transition (graceful or destroyed).
    fn end(&self, destroyed: bool) {
        let _ = destroyed;
    }
}

/// Object-safe view of a buffered host, exposed to producers via [`Sink`].
trait BufferedOps<T> {
    fn push(&self, item: T);
    fn close_stream(&self);
    fn is_closed(&self) -> bool;
    fn is_done(&self) -> bool;
    fn pushed(&self) -> usize;
    fn capacity(&self) -> usize;
    fn schedule_fill(&self);
    fn resume(&self, count: usize, done: Signal);
    fn emit_error(&self, err: Error);
}

/// A producer's weak handle onto its buffered host.
///
/// All operations are no-ops once the host is gone or done, which absorbs
/// the race where a producer settles after a concurrent destroy.
pub struct Sink<T> {
    ops: Weak<dyn BufferedOps<T>>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Sink {
            ops: Weak::clone(&self.ops),
        }
    }
}

impl<T: 'static> Sink<T> {
    /// Append one item to the host's buffer. Dropped silently when done.
    pub fn push(&self, item: T) {
        if let Some(ops) = self.ops.upgrade() {
            ops.push(item);
        }
    }

    /// Request graceful close of the host.
    pub fn close(&self) {
        if let Some(ops) = self.ops.upgrade() {
            ops.close_stream();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.ops.upgrade().map_or(true, |ops| ops.is_closed())
    }

    pub fn is_done(&self) -> bool {
        self.ops.upgrade().map_or(true, |ops| ops.is_done())
    }

    /// Items pushed in the current fill round.
    pub fn pushed(&self) -> usize {
        self.ops.upgrade().map_or(0, |ops| ops.pushed())
    }

    /// The host's buffer capacity.
    pub fn capacity(&self) -> usize {
        self.ops.upgrade().map_or(0, |ops| ops.capacity())
    }

    /// Ask the host for another fill pass on the task queue.
    pub fn schedule_fill(&self) {
        if let Some(ops) = self.ops.upgrade() {
            ops.schedule_fill();
        }
    }

    /// Defer another `pull` pass within the current fill round, handing
    /// `done` back to the producer. Used by asynchronous transforms.
    pub fn resume(&self, count: usize, done: Signal) {
        if let Some(ops) = self.ops.upgrade() {
            ops.resume(count, done);
        }
    }

    /// Re-emit an upstream error on the host.
    pub fn emit_error(&self, err: Error) {
        if let Some(ops) = self.ops.upgrade() {
            ops.emit_error(err);
        }
    }
}

pub struct Buffered<T: 'static, P: Produce<T>> {
    core: Core<T>,
    producer: P,
    buffer: RefCell<VecDeque<T>>,
    max_buffer_size: usize,
    read_ahead: usize,
    reading: Cell<bool>,
    pushed: Cell<usize>,
    weak: Weak<Buffered<T, P>>,
}

impl<T: 'static, P: Produce<T>> Buffered<T, P> {
    /// Build the stream in INIT with the reading lock held, and schedule
    /// the deferred `begin` step.
    pub fn spawn(producer: P, cfg: &StreamConfig) -> Rc<Self> {
        let auto_start = cfg.auto_start;
        let rc = Rc::new_cyclic(|weak: &Weak<Buffered<T, P>>| {
            let me: Weak<dyn Stream<T>> = weak.clone();
            Buffered {
                core: Core::new(me, State::Init),
                producer,
                buffer: RefCell::new(VecDeque::new()),
                max_buffer_size: cfg.max_buffer_size.max(1),
                read_ahead: cfg.read_ahead.max(1),
                reading: Cell::new(true),
                pushed: Cell::new(0),
                weak: weak.clone(),
            }
        });
        let weak = rc.weak.clone();
        task::defer(move || {
            if let Some(stream) = weak.upgrade() {
                stream.init(auto_start);
            }
        });
        rc
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn sink(&self) -> Sink<T> {
        let ops: Weak<dyn BufferedOps<T>> = self.weak.clone();
        Sink { ops }
    }

    fn init(&self, auto_start: bool) {
        if self.core.state().is_done() {
            return;
        }
        let weak = self.weak.clone();
        let done = Signal::new(move || {
            let Some(stream) = weak.upgrade() else { return };
            stream.reading.set(false);
            if stream.core.state().is_done() {
                return;
            }
            if stream.core.state().is_closed() {
                stream.complete_close();
            } else {
                stream.core.change_state(State::Open);
                if auto_start {
                    self::schedule_fill(&stream.weak);
                } else {
                    // No production yet, but read() may be called without
                    // waiting for a readable event.
                    stream.core.set_readable(true);
                }
            }
        });
        self.producer.begin(&self.sink(), done);
    }

    fn fill_buffer(&self) {
        if self.reading.get() || self.core.state().is_done() {
            return;
        }
        if self.core.state().is_closed() {
            self.complete_close();
            return;
        }
        let len = self.buffer.borrow().len();
        let needed = self.max_buffer_size.saturating_sub(len).min(self.read_ahead);
        if needed == 0 {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(needed, buffered = len, "fill round");
        self.pushed.set(0);
        self.reading.set(true);
        let weak = self.weak.clone();
        let done = Signal::new(move || {
            let Some(stream) = weak.upgrade() else { return };
            stream.reading.set(false);
            if stream.core.state().is_done() {
                return;
            }
            if stream.core.state().is_closed() {
                stream.complete_close();
            } else if stream.pushed.get() > 0 {
                stream.core.set_readable(true);
                if stream.buffer.borrow().len() < stream.max_buffer_size / 2 {
                    self::schedule_fill(&stream.weak);
                }
            }
        });
        self.producer.pull(needed, &self.sink(), done);
    }

    /// CLOSED transition plus the flush step; the end task fires once the
    /// buffer is empty (immediately, or from a later `read`).
    fn complete_close(&self) {
        if !self.core.change_state(State::Closed) {
            return;
        }
        self.reading.set(true);
        let weak = self.weak.clone();
        let done = Signal::new(move || {
            let Some(stream) = weak.upgrade() else { return };
            stream.reading.set(false);
            if stream.core.state().is_done() {
                return;
            }
            if stream.buffer.borrow().is_empty() {
                stream.core.defer_finish(false);
            }
        });
        self.producer.flush(&self.sink(), done);
    }
}

fn schedule_fill<T: 'static, P: Produce<T>>(weak: &Weak<Buffered<T, P>>) {
    let weak = weak.clone();
    task::defer(move || {
        if let Some(stream) = weak.upgrade() {
            stream.fill_buffer();
        }
    });
}

impl<T: 'static, P: Produce<T>> BufferedOps<T> for Buffered<T, P> {
    fn push(&self, item: T) {
        if self.core.state().is_done() {
            return;
        }
        self.pushed.set(self.pushed.get() + 1);
        self.buffer.borrow_mut().push_back(item);
        self.core.set_readable(true);
    }

    fn close_stream(&self) {
        Stream::close(self);
    }

    fn is_closed(&self) -> bool {
        self.core.state().is_closed()
    }

    fn is_done(&self) -> bool {
        self.core.state().is_done()
    }

    fn pushed(&self) -> usize {
        self.pushed.get()
    }

    fn capacity(&self) -> usize {
        self.max_buffer_size
    }

    fn schedule_fill(&self) {
        self::schedule_fill(&self.weak);
    }

    fn resume(&self, count: usize, done: Signal) {
        let weak = self.weak.clone();
        task::defer(move || {
            let Some(stream) = weak.upgrade() else { return };
            if stream.core.state().is_done() {
                // The round died with the stream; the signal is dropped.
                drop(done);
                return;
            }
            stream.producer.pull(count, &stream.sink(), done);
        });
    }

    fn emit_error(&self, err: Error) {
        self.core.emit_error(&err);
    }
}

impl<T: 'static, P: Produce<T>> Stream<T> for Buffered<T, P> {
    fn core(&self) -> &Core<T> {
        &self.core
    }

    fn read(&self) -> Option<T> {
        if self.core.state().is_done() {
            return None;
        }
        let item = self.buffer.borrow_mut().pop_front();
        if item.is_none() {
            self.core.set_readable(false);
        }
        if !self.reading.get() {
            let len = self.buffer.borrow().len();
            if len < self.max_buffer_size {
                if !self.core.state().is_closed() {
                    self::schedule_fill(&self.weak);
                } else if len == 0 {
                    self.core.defer_finish(false);
                }
            }
        }
        item
    }

    fn close(&self) {
        if self.core.state().is_closed() {
            return;
        }
        if self.reading.get() {
            // Parked: the in-flight signal completes the close.
            self.core.change_state(State::Closing);
        } else {
            self.complete_close();
        }
    }

    fn on_destroy(&self, _cause: Option<&Error>, done: Signal) {
        self.buffer.borrow_mut().clear();
        done.fire();
    }

    fn on_ending(&self, destroyed: bool) {
        self.producer.end(destroyed);
    }
}

/// Stand-alone buffered stream over a [`Produce`] strategy: the
/// extension point for custom producers.
pub fn buffered<T: 'static, P: Produce<T>>(producer: P, cfg: &StreamConfig) -> StreamRef<T> {
    Buffered::spawn(producer, cfg)
}
