//! Buffered production: the fill loop, the single-flight lock, close and
//! destroy interleavings.

use std::cell::Cell;
use std::rc::Rc;

use rill::prelude::*;
use rill::{buffered, task, Buffered, Error, Produce, Signal, Sink, StreamConfig};

/// Producer that counts up to `total`, honoring the requested count, and
/// records how it was driven.
struct Counter {
    state: Rc<CounterState>,
}

#[derive(Default)]
struct CounterState {
    next: Cell<i64>,
    total: i64,
    begun: Cell<bool>,
    flushed: Cell<bool>,
    pulls: Cell<usize>,
    in_pull: Cell<bool>,
    largest_request: Cell<usize>,
}

impl CounterState {
    fn new(total: i64) -> Rc<Self> {
        Rc::new(Self {
            total,
            ..Self::default()
        })
    }
}

impl Produce<i64> for Counter {
    fn begin(&self, _sink: &Sink<i64>, done: Signal) {
        self.state.begun.set(true);
        done.fire();
    }

    fn pull(&self, count: usize, sink: &Sink<i64>, done: Signal) {
        assert!(!self.state.in_pull.get(), "pull must be single-flight");
        self.state.in_pull.set(true);
        self.state.pulls.set(self.state.pulls.get() + 1);
        self.state
            .largest_request
            .set(self.state.largest_request.get().max(count));
        for _ in 0..count {
            let n = self.state.next.get();
            if n >= self.state.total {
                sink.close();
                break;
            }
            sink.push(n);
            self.state.next.set(n + 1);
        }
        self.state.in_pull.set(false);
        done.fire();
    }

    fn flush(&self, _sink: &Sink<i64>, done: Signal) {
        self.state.flushed.set(true);
        done.fire();
    }
}

#[test]
fn test_fill_stops_at_buffer_capacity() {
    let state = CounterState::new(100);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig::default(),
    );
    task::drain();
    // Only one buffer's worth was produced without a consumer.
    assert_eq!(state.next.get(), 4);
    assert!(state.begun.get());
    assert!(stream.readable());

    // A read frees one slot and triggers exactly one more fill round.
    assert_eq!(stream.read(), Some(0));
    task::drain();
    assert_eq!(state.next.get(), 5);
}

#[test]
fn test_pull_requests_are_capped() {
    let state = CounterState::new(200);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig {
            max_buffer_size: usize::MAX,
            auto_start: true,
            read_ahead: 128,
        },
    );
    assert_eq!(collect(&stream), (0..200).collect::<Vec<i64>>());
    assert_eq!(state.largest_request.get(), 128);
}

#[test]
fn test_auto_start_false_waits_for_first_read() {
    let state = CounterState::new(10);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig {
            auto_start: false,
            ..StreamConfig::default()
        },
    );
    task::drain();
    assert_eq!(state.pulls.get(), 0, "no production before the first read");
    assert!(stream.readable(), "readable signals that read() may be tried");

    assert_eq!(stream.read(), None);
    task::drain();
    assert!(state.pulls.get() > 0);
    assert_eq!(stream.read(), Some(0));
}

#[test]
fn test_graceful_close_flushes_and_drains() {
    let state = CounterState::new(100);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig::default(),
    );
    task::drain();
    stream.close();
    assert!(state.flushed.get());
    // Already-buffered items are still delivered after close.
    assert_eq!(collect(&stream), vec![0, 1, 2, 3]);
    assert!(stream.ended());
}

#[test]
fn test_producer_close_ends_stream() {
    let state = CounterState::new(3);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig::default(),
    );
    assert_eq!(collect(&stream), vec![0, 1, 2]);
    assert!(stream.ended());
    assert!(state.flushed.get());
}

struct Idle;

impl Produce<i64> for Idle {}

#[test]
fn test_destroy_emits_error_and_skips_end() {
    let stream = buffered(Idle, &StreamConfig::default());
    let errors = Rc::new(Cell::new(0));
    let ends = Rc::new(Cell::new(0));
    let error_counter = Rc::clone(&errors);
    stream.on_error(Box::new(move |err| {
        assert_eq!(*err, Error::Aborted("cancelled".into()));
        error_counter.set(error_counter.get() + 1);
    }));
    let end_counter = Rc::clone(&ends);
    stream.on_end(Box::new(move || end_counter.set(end_counter.get() + 1)));

    stream.destroy_with(Some(Error::Aborted("cancelled".into())));
    assert!(stream.destroyed());
    task::drain();
    assert_eq!(errors.get(), 1);
    assert_eq!(ends.get(), 0);
    assert_eq!(stream.read(), None);
}

#[test]
fn test_destroy_discards_buffered_items() {
    let state = CounterState::new(100);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig::default(),
    );
    task::drain();
    assert!(stream.readable());
    stream.destroy();
    assert_eq!(stream.read(), None);
    task::drain();
    assert!(stream.destroyed());
}

#[test]
fn test_push_after_done_is_silently_dropped() {
    let state = CounterState::new(100);
    let host = Buffered::spawn(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig::default(),
    );
    let sink = host.sink();
    task::drain();
    host.destroy();
    sink.push(999);
    assert_eq!(host.read(), None);
}

#[test]
fn test_close_before_init_still_ends() {
    let state = CounterState::new(100);
    let stream = buffered(
        Counter {
            state: Rc::clone(&state),
        },
        &StreamConfig::default(),
    );
    // The stream is still INIT with the reading lock held; the close
    // parks and completes after begin.
    stream.close();
    assert!(stream.closed());
    task::drain();
    assert!(stream.ended());
    assert_eq!(state.pulls.get(), 0);
    assert!(state.flushed.get());
}
