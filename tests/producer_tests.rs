//! Trivial producer behavior: empty, singleton, array, integer range.

use std::cell::Cell;
use std::rc::Rc;

use rill::prelude::*;
use rill::task;

fn end_counter(stream: &StreamRef<i64>) -> Rc<Cell<usize>> {
    let ends = Rc::new(Cell::new(0));
    let counter = Rc::clone(&ends);
    stream.on_end(Box::new(move || counter.set(counter.get() + 1)));
    ends
}

#[test]
fn test_empty_is_ended_at_construction() {
    let stream = empty::<i64>();
    assert!(stream.ended());
    assert!(stream.done());
    assert!(!stream.readable());
    assert_eq!(stream.read(), None);
}

#[test]
fn test_empty_still_emits_end_to_sync_listeners() {
    let stream = empty::<i64>();
    let ends = end_counter(&stream);
    assert_eq!(ends.get(), 0);
    task::drain();
    assert_eq!(ends.get(), 1);
}

#[test]
fn test_single_yields_one_item_then_ends() {
    let stream = single(42i64);
    assert!(stream.readable());
    assert_eq!(stream.read(), Some(42));
    assert_eq!(stream.read(), None);
    assert!(stream.closed());
    task::drain();
    assert!(stream.ended());
}

#[test]
fn test_single_of_none_closes_immediately() {
    let stream = single::<i64>(None);
    assert!(stream.closed());
    assert!(!stream.readable());
    assert_eq!(stream.read(), None);
    task::drain();
    assert!(stream.ended());
}

#[test]
fn test_array_pull_mode() {
    let stream = from_array(vec![1i64, 2, 3]);
    assert!(stream.readable());
    assert_eq!(stream.read(), Some(1));
    assert_eq!(stream.read(), Some(2));
    assert!(!stream.closed());
    assert_eq!(stream.read(), Some(3));
    assert!(stream.closed());
    assert_eq!(stream.read(), None);
    task::drain();
    assert!(stream.ended());
}

#[test]
fn test_empty_array_closes_immediately() {
    let stream = from_array(Vec::<i64>::new());
    assert!(stream.closed());
    task::drain();
    assert!(stream.ended());
}

#[test]
fn test_array_flow_mode() {
    let stream = from_array(vec![1i64, 2, 3]);
    assert_eq!(collect(&stream), vec![1, 2, 3]);
    assert!(stream.ended());
}

#[test]
fn test_array_destroy_discards_items() {
    let stream = from_array(vec![1i64, 2, 3]);
    let ends = end_counter(&stream);
    stream.destroy();
    assert!(stream.destroyed());
    assert_eq!(stream.read(), None);
    task::drain();
    assert_eq!(ends.get(), 0, "no end on the destroy path");
}

#[test]
fn test_integer_range_flow_mode() {
    let stream = integer_range(RangeOptions::bounded(0, 4));
    assert_eq!(collect(&stream), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_integer_range_empty_when_inverted() {
    let stream = integer_range(RangeOptions::bounded(5, 3));
    assert!(stream.closed());
    assert_eq!(collect(&stream), Vec::<i64>::new());
    assert!(stream.ended());
}

#[test]
fn test_integer_range_descending() {
    let stream = integer_range(RangeOptions::bounded(5, 3).step(-1));
    assert_eq!(collect(&stream), vec![5, 4, 3]);
}

#[test]
fn test_integer_range_unbounded_reads_on_demand() {
    let stream = integer_range(RangeOptions {
        start: 10,
        end: None,
        step: 10,
    });
    assert_eq!(stream.read(), Some(10));
    assert_eq!(stream.read(), Some(20));
    assert_eq!(stream.read(), Some(30));
    assert!(!stream.done());
}

#[test]
fn test_integer_range_overflow_closes() {
    let stream = integer_range(RangeOptions {
        start: i64::MAX,
        end: None,
        step: 1,
    });
    assert_eq!(stream.read(), Some(i64::MAX));
    assert!(stream.closed());
    assert_eq!(stream.read(), None);
}
