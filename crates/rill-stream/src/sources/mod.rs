//! Trivial producers: empty, singleton, array, integer range.

pub mod array;
pub mod range;

pub use array::from_array;
pub use range::{integer_range, RangeOptions};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use rill_core::state::State;
use rill_core::task;

use crate::base::Core;
use crate::traits::{Stream, StreamRef};

/// A stream that never yields anything.
///
/// Constructed already ENDED; `end` still fires on a deferred task so
/// listeners attached synchronously after construction observe it.
struct EmptyStream<T: 'static> {
    core: Core<T>,
}

impl<T: 'static> Stream<T> for EmptyStream<T> {
    fn core(&self) -> &Core<T> {
        &self.core
    }
}

pub fn empty<T: 'static>() -> StreamRef<T> {
    let stream: Rc<EmptyStream<T>> = Rc::new_cyclic(|weak: &Weak<EmptyStream<T>>| {
        let me: Weak<dyn Stream<T>> = weak.clone();
        EmptyStream {
            core: Core::new(me, State::Ended),
        }
    });
    let me = stream.core.me();
    task::defer(move || {
        if let Some(stream) = me.upgrade() {
            stream.core().events().emit_end();
            stream.core().events().release_terminal();
        }
    });
    stream
}

/// A stream of exactly one item; a `None` input closes immediately and
/// yields nothing.
struct SingletonStream<T: 'static> {
    core: Core<T>,
    item: RefCell<Option<T>>,
}

impl<T: 'static> Stream<T> for SingletonStream<T> {
    fn core(&self) -> &Core<T> {
        &self.core
    }

    fn read(&self) -> Option<T> {
        let item = self.item.borrow_mut().take();
        if item.is_some() {
            self.close();
        }
        item
    }
}

pub fn single<T: 'static>(item: impl Into<Option<T>>) -> StreamRef<T> {
    let item = item.into();
    let present = item.is_some();
    let stream: Rc<SingletonStream<T>> = Rc::new_cyclic(|weak: &Weak<SingletonStream<T>>| {
        let me: Weak<dyn Stream<T>> = weak.clone();
        SingletonStream {
            core: Core::new(me, State::Open),
            item: RefCell::new(item),
        }
    });
    if present {
        stream.core.set_readable(true);
    } else {
        stream.close();
    }
    stream
}
