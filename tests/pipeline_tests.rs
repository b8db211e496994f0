//! End-to-end pipelines and the ambient pieces: task queue, config,
//! wrapping.

use std::cell::Cell;
use std::rc::Rc;

use rill::prelude::*;
use rill::{task, StreamConfig};

#[test]
fn test_task_queue_runs_in_fifo_order() {
    let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
    for n in 0..3 {
        let sink = Rc::clone(&seen);
        task::defer(move || sink.borrow_mut().push(n));
    }
    assert_eq!(task::pending(), 3);
    let ran = task::drain();
    assert_eq!(ran, 3);
    assert_eq!(&*seen.borrow(), &[0, 1, 2]);
    assert_eq!(task::pending(), 0);
}

#[test]
fn test_tasks_scheduled_by_tasks_run_in_the_same_drain() {
    let hits = Rc::new(Cell::new(0));
    let outer = Rc::clone(&hits);
    task::defer(move || {
        outer.set(outer.get() + 1);
        let inner = Rc::clone(&outer);
        task::defer(move || inner.set(inner.get() + 1));
    });
    assert_eq!(task::drain(), 2);
    assert_eq!(hits.get(), 2);
}

#[test]
fn test_reentrant_drain_is_a_no_op() {
    let inner_ran = Rc::new(Cell::new(usize::MAX));
    let probe = Rc::clone(&inner_ran);
    task::defer(move || probe.set(task::drain()));
    task::drain();
    assert_eq!(inner_ran.get(), 0);
}

#[test]
fn test_config_defaults() {
    let cfg = StreamConfig::default();
    assert_eq!(cfg.max_buffer_size, 4);
    assert!(cfg.auto_start);
    assert_eq!(cfg.read_ahead, 128);
}

#[test]
fn test_config_serde_round_trip() {
    let cfg = StreamConfig {
        max_buffer_size: 16,
        auto_start: false,
        read_ahead: 32,
    };
    let encoded = serde_json::to_string(&cfg).expect("encode");
    let decoded: StreamConfig = serde_json::from_str(&encoded).expect("decode");
    assert_eq!(decoded.max_buffer_size, 16);
    assert!(!decoded.auto_start);
    assert_eq!(decoded.read_ahead, 32);
}

#[test]
fn test_config_from_env() {
    std::env::set_var("RILL_MAX_BUFFER_SIZE", "9");
    std::env::set_var("RILL_AUTO_START", "false");
    let cfg = StreamConfig::from_env();
    std::env::remove_var("RILL_MAX_BUFFER_SIZE");
    std::env::remove_var("RILL_AUTO_START");
    assert_eq!(cfg.max_buffer_size, 9);
    assert!(!cfg.auto_start);
    assert_eq!(cfg.read_ahead, 128);
}

#[test]
fn test_wrap_is_identity_with_fresh_buffering() {
    let source = from_array(vec![1i64, 2, 3]);
    let wrapped = wrap(&source, TransformOptions::new()).unwrap();
    assert_eq!(collect(&wrapped), vec![1, 2, 3]);
    assert!(wrapped.ended());
}

#[test]
fn test_long_pipeline() {
    let stream = integer_range(RangeOptions::bounded(0, 99))
        .filter(|n| n % 2 == 0)
        .unwrap()
        .map(|n| n * 3)
        .unwrap()
        .skip(2)
        .unwrap()
        .take(4)
        .unwrap();
    assert_eq!(collect(&stream), vec![12, 18, 24, 30]);
    assert_eq!(task::pending(), 0, "pipelines drain to quiescence");
}

#[test]
fn test_pipeline_with_clone_fan_out() {
    let base = integer_range(RangeOptions::bounded(1, 5))
        .map(|n| n * n)
        .unwrap();
    let a = base.clone_stream().unwrap();
    let b = base.clone_stream().unwrap();
    let capped = b.take(2).unwrap();
    assert_eq!(collect(&a), vec![1, 4, 9, 16, 25]);
    assert_eq!(collect(&capped), vec![1, 4]);
}

#[test]
fn test_flow_and_pull_mode_agree() {
    let flow = integer_range(RangeOptions::bounded(0, 9))
        .map(|n| n + 1)
        .unwrap();
    let flow_items = collect(&flow);

    let pull = integer_range(RangeOptions::bounded(0, 9))
        .map(|n| n + 1)
        .unwrap();
    let mut pull_items = Vec::new();
    while !pull.done() {
        task::drain();
        while let Some(item) = pull.read() {
            pull_items.push(item);
        }
        task::drain();
    }
    assert_eq!(flow_items, pull_items);
}

#[test]
fn test_nested_transform_surround_pipeline() {
    let stream = from_array(vec![10i64, 20, 30])
        .transform(
            TransformOptions::new()
                .filter(|n: &i64| *n != 20)
                .map(|n: i64| Some(n / 10)),
        )
        .unwrap()
        .surround(vec![0i64], vec![9i64])
        .unwrap();
    assert_eq!(collect(&stream), vec![0, 1, 3, 9]);
}
