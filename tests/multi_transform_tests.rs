//! Multi transforms: per-item sub-iterators with ordered concatenation.

use rill::prelude::*;
use rill::{multi_transform, task};

#[test]
fn test_flat_map_concatenates_in_order() {
    let stream = from_array(vec![1i64, 2])
        .flat_map(|n| from_array(vec![n, n * 10]))
        .unwrap();
    assert_eq!(collect(&stream), vec![1, 10, 2, 20]);
    assert!(stream.ended());
}

#[test]
fn test_flat_map_over_ranges() {
    let stream = from_array(vec![1i64, 5])
        .flat_map(|n| integer_range(RangeOptions::bounded(n, n + 2)))
        .unwrap();
    assert_eq!(collect(&stream), vec![1, 2, 3, 5, 6, 7]);
}

#[test]
fn test_default_factory_is_identity() {
    let source = from_array(vec![1i64, 2, 3]);
    let stream = multi_transform(&source, MultiOptions::new()).unwrap();
    assert_eq!(collect(&stream), vec![1, 2, 3]);
}

#[test]
fn test_factory_returning_none_yields_empty_transformer() {
    let source = from_array(vec![1i64, 2, 3]);
    let stream =
        multi_transform(&source, MultiOptions::with_factory(|_: i64| None::<StreamRef<i64>>))
            .unwrap();
    assert_eq!(collect(&stream), Vec::<i64>::new());
    assert!(stream.ended());
}

#[test]
fn test_empty_transformers_substitute_original_when_optional() {
    let source = from_array(vec![1i64, 2, 3]);
    let options = MultiOptions::with_factory(|n: i64| {
        if n % 2 == 0 {
            Some(empty())
        } else {
            Some(from_array(vec![n * 100]))
        }
    })
    .optional(true);
    let stream = multi_transform(&source, options).unwrap();
    assert_eq!(collect(&stream), vec![100, 2, 300]);
}

#[test]
fn test_more_items_than_queue_capacity() {
    let source = integer_range(RangeOptions::bounded(0, 19));
    let stream = source
        .flat_map(|n| from_array(vec![n]))
        .unwrap();
    assert_eq!(collect(&stream), (0..20).collect::<Vec<i64>>());
}

#[test]
fn test_multi_transform_end_fires_after_queue_drains() {
    let stream = from_array(vec![1i64, 2])
        .flat_map(|n| from_array(vec![n, n + 10]))
        .unwrap();
    let mut seen = Vec::new();
    while !stream.done() {
        task::drain();
        while let Some(item) = stream.read() {
            seen.push(item);
        }
        task::drain();
    }
    assert_eq!(seen, vec![1, 11, 2, 12]);
    assert!(stream.ended());
}
