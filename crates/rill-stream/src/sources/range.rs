//! Integer range producer.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use rill_core::state::State;

use crate::base::Core;
use crate::traits::{Stream, StreamRef};

/// Endpoints of an [`integer_range`]. `end: None` leaves the range
/// unbounded in the step's direction.
#[derive(Debug, Clone)]
pub struct RangeOptions {
    pub start: i64,
    pub end: Option<i64>,
    pub step: i64,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            start: 0,
            end: None,
            step: 1,
        }
    }
}

impl RangeOptions {
    /// `start..=end` with step 1 (or -1 when `end < start` callers pass a
    /// negative step explicitly).
    pub fn bounded(start: i64, end: i64) -> Self {
        Self {
            start,
            end: Some(end),
            step: 1,
        }
    }

    pub fn step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    fn is_empty(&self) -> bool {
        match self.end {
            Some(end) => {
                if self.step >= 0 {
                    self.start > end
                } else {
                    self.start < end
                }
            }
            None => false,
        }
    }
}

struct IntegerRangeStream {
    core: Core<i64>,
    current: Cell<i64>,
    end: Option<i64>,
    step: i64,
}

impl IntegerRangeStream {
    fn past_end(&self, value: i64) -> bool {
        match self.end {
            Some(end) => {
                if self.step >= 0 {
                    value > end
                } else {
                    value < end
                }
            }
            None => false,
        }
    }
}

impl Stream<i64> for IntegerRangeStream {
    fn core(&self) -> &Core<i64> {
        &self.core
    }

    fn read(&self) -> Option<i64> {
        if self.closed() {
            return None;
        }
        let item = self.current.get();
        match item.checked_add(self.step) {
            Some(next) => {
                self.current.set(next);
                if self.past_end(next) {
                    self.close();
                }
            }
            // Overflow counts as running past the end.
            None => self.close(),
        }
        Some(item)
    }
}

/// Stream of integers from `start`, advancing by `step`, up to and
/// including `end`. Empty ranges close at construction.
pub fn integer_range(options: RangeOptions) -> StreamRef<i64> {
    let present = !options.is_empty();
    let stream: Rc<IntegerRangeStream> = Rc::new_cyclic(|weak: &Weak<IntegerRangeStream>| {
        let me: Weak<dyn Stream<i64>> = weak.clone();
        IntegerRangeStream {
            core: Core::new(me, State::Open),
            current: Cell::new(options.start),
            end: options.end,
            step: options.step,
        }
    });
    if present {
        stream.core.set_readable(true);
    } else {
        stream.close();
    }
    stream
}
