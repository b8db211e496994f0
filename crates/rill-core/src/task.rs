//! Cooperative deferred-task queue.
//!
//! All asynchronicity in rill is expressed through this queue: "run after
//! the current call stack unwinds". Execution is single-threaded, so the
//! queue is a thread-local `VecDeque` rather than a channel, and there is
//! no locking anywhere.
//!
//! Streams enqueue work with [`defer`]; a driver (test, collector, event
//! loop adapter) pumps it with [`drain`] until quiescent.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

type Task = Box<dyn FnOnce()>;

struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
    draining: Cell<bool>,
}

impl TaskQueue {
    fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
        }
    }
}

thread_local! {
    static QUEUE: TaskQueue = TaskQueue::new();
}

/// Schedule `task` to run after the current call stack unwinds.
pub fn defer(task: impl FnOnce() + 'static) {
    QUEUE.with(|q| q.queue.borrow_mut().push_back(Box::new(task)));
}

/// Run deferred tasks until the queue is empty, including tasks enqueued
/// by tasks. Returns the number of tasks executed. A reentrant call from
/// inside a task is a no-op; the outer drain picks up whatever was added.
pub fn drain() -> usize {
    QUEUE.with(|q| {
        if q.draining.get() {
            return 0;
        }
        q.draining.set(true);
        let mut ran = 0;
        loop {
            let task = q.queue.borrow_mut().pop_front();
            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        q.draining.set(false);
        ran
    })
}

/// Number of tasks currently queued.
pub fn pending() -> usize {
    QUEUE.with(|q| q.queue.borrow().len())
}

/// One-shot completion callback.
///
/// Every asynchronous step in the production protocol (`begin`, `pull`,
/// `flush`, `destroy`, user transforms) receives one of these and fires it
/// exactly once when the step settles. Firing consumes the signal, so a
/// second completion is unrepresentable. The callback may run on the same
/// stack or after any number of deferred tasks; callers must not assume
/// state survived across it.
pub struct Signal(Box<dyn FnOnce()>);

impl Signal {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Signal(Box::new(f))
    }

    /// Complete the step.
    pub fn fire(self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Signal")
    }
}
