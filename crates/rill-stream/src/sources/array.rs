//! Stream over an owned sequence of items.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use rill_core::state::State;
use rill_core::task::Signal;
use rill_core::Error;

use crate::base::Core;
use crate::traits::{Stream, StreamRef};

struct ArrayStream<T: 'static> {
    core: Core<T>,
    items: RefCell<VecDeque<T>>,
}

impl<T: 'static> Stream<T> for ArrayStream<T> {
    fn core(&self) -> &Core<T> {
        &self.core
    }

    fn read(&self) -> Option<T> {
        let (item, drained) = {
            let mut items = self.items.borrow_mut();
            let item = items.pop_front();
            (item, items.is_empty())
        };
        if item.is_some() && drained {
            self.close();
        }
        item
    }

    fn on_destroy(&self, _cause: Option<&Error>, done: Signal) {
        self.items.borrow_mut().clear();
        done.fire();
    }
}

/// Stream over `items` in order. An empty input closes immediately.
pub fn from_array<T: 'static>(items: Vec<T>) -> StreamRef<T> {
    let present = !items.is_empty();
    let stream: Rc<ArrayStream<T>> = Rc::new_cyclic(|weak: &Weak<ArrayStream<T>>| {
        let me: Weak<dyn Stream<T>> = weak.clone();
        ArrayStream {
            core: Core::new(me, State::Open),
            items: RefCell::new(items.into()),
        }
    });
    if present {
        stream.core.set_readable(true);
    } else {
        stream.close();
    }
    stream
}
