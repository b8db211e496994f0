//! Lifecycle, event, and property behavior of the base stream contract.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;

use rill::prelude::*;
use rill::{copy_properties, task, Error, ListenerId};

#[test]
fn test_states_are_ordered() {
    assert!(State::Init < State::Open);
    assert!(State::Open < State::Closing);
    assert!(State::Closing < State::Closed);
    assert!(State::Closed < State::Ended);
    assert!(State::Ended < State::Destroyed);
}

#[test]
fn test_close_is_idempotent() {
    let stream = from_array(vec![1i64]);
    let ends = Rc::new(Cell::new(0));
    let counter = Rc::clone(&ends);
    stream.on_end(Box::new(move || counter.set(counter.get() + 1)));
    stream.close();
    stream.close();
    task::drain();
    assert!(stream.ended());
    assert_eq!(ends.get(), 1);
}

#[test]
fn test_destroy_after_end_is_a_no_op() {
    let stream = from_array(vec![1i64]);
    stream.close();
    task::drain();
    assert!(stream.ended());
    stream.destroy();
    assert!(stream.ended());
    assert!(!stream.destroyed());
}

#[test]
fn test_destroy_is_idempotent_and_synchronous() {
    let stream = from_array(vec![1i64, 2]);
    let errors = Rc::new(Cell::new(0));
    let counter = Rc::clone(&errors);
    stream.on_error(Box::new(move |_| counter.set(counter.get() + 1)));
    stream.destroy_with(Some(Error::Aborted("gone".into())));
    assert!(stream.destroyed());
    stream.destroy_with(Some(Error::Aborted("again".into())));
    task::drain();
    assert_eq!(errors.get(), 1);
}

#[test]
fn test_terminal_listeners_are_released() {
    let stream = from_array(vec![1i64]);
    stream.on_end(Box::new(|| {}));
    stream.on_data(Box::new(|_| {}));
    stream.on_error(Box::new(|_| {}));
    task::drain();
    assert!(stream.ended());
    assert!(!stream.has_listeners(EventKind::End));
    assert!(!stream.has_listeners(EventKind::Data));
    assert!(!stream.has_listeners(EventKind::Readable));
    assert!(
        stream.has_listeners(EventKind::Error),
        "error listeners survive the terminal transition"
    );
    assert!(!stream.readable());
}

#[test]
fn test_error_does_not_change_state() {
    let stream = from_array(vec![1i64, 2]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    stream.on_error(Box::new(move |err| sink.borrow_mut().push(err.clone())));
    stream.core().emit_error(&Error::Aborted("hiccup".into()));
    assert_eq!(stream.state(), State::Open);
    assert_eq!(stream.read(), Some(1));
    assert_eq!(&*seen.borrow(), &[Error::Aborted("hiccup".into())]);
}

#[test]
fn test_flow_mode_detach_and_reattach() {
    let stream = from_array(vec![1i64, 2, 3]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let id: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

    // The listener detaches itself after the first item.
    let sink = Rc::clone(&seen);
    let own_id = Rc::clone(&id);
    let weak = Rc::downgrade(&stream);
    let listener_id = stream.on_data(Box::new(move |item: &i64| {
        sink.borrow_mut().push(*item);
        if let (Some(stream), Some(id)) = (weak.upgrade(), own_id.take()) {
            stream.off(EventKind::Data, id);
        }
    }));
    id.set(Some(listener_id));
    task::drain();
    assert_eq!(&*seen.borrow(), &[1]);
    assert!(!stream.done(), "detaching re-arms on-demand mode");

    // On-demand reads still work, and a new listener resumes flow.
    assert_eq!(stream.read(), Some(2));
    let sink = Rc::clone(&seen);
    stream.on_data(Box::new(move |item: &i64| sink.borrow_mut().push(*item)));
    task::drain();
    assert_eq!(&*seen.borrow(), &[1, 2, 3]);
    assert!(stream.ended());
}

#[test]
fn test_property_set_then_get() {
    let stream = from_array(vec![1i64]);
    assert_eq!(stream.get_property("meta"), None);
    stream.set_property("meta", json!({"rows": 3}));
    assert_eq!(stream.get_property("meta"), Some(json!({"rows": 3})));
}

#[test]
fn test_property_callbacks_fire_after_set_in_order() {
    let stream = from_array(vec![1i64]);
    let seen = Rc::new(RefCell::new(Vec::new()));

    for tag in ["first", "second"] {
        let sink = Rc::clone(&seen);
        stream.get_property_with(
            "kind",
            Box::new(move |value| sink.borrow_mut().push((tag, value))),
        );
    }
    task::drain();
    assert!(seen.borrow().is_empty(), "callbacks wait for the value");

    stream.set_property("kind", json!("numbers"));
    task::drain();
    assert_eq!(
        &*seen.borrow(),
        &[("first", json!("numbers")), ("second", json!("numbers"))]
    );

    // A late getter sees the stored value on the next drain.
    let sink = Rc::clone(&seen);
    stream.get_property_with(
        "kind",
        Box::new(move |value| sink.borrow_mut().push(("late", value))),
    );
    task::drain();
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn test_copy_properties_mirrors_values() {
    let source = from_array(vec![1i64]);
    let dest = from_array(vec![2i64]);
    copy_properties(&source, &dest, &["schema", "origin"]);
    source.set_property("schema", json!(["n"]));
    task::drain();
    assert_eq!(dest.get_property("schema"), Some(json!(["n"])));
    assert_eq!(dest.get_property("origin"), None);

    source.set_property("origin", json!("test"));
    task::drain();
    assert_eq!(dest.get_property("origin"), Some(json!("test")));
}

#[test]
fn test_set_properties_snapshot() {
    let stream = from_array(vec![1i64]);
    stream.set_properties(
        [
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!("two")),
        ]
        .into_iter()
        .collect(),
    );
    let snapshot = stream.properties();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["a"], json!(1));
    assert_eq!(snapshot["b"], json!("two"));
}
