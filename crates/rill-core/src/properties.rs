//! Deferred-get property store.
//!
//! Every stream carries a bag of named values. Reads can be immediate
//! (`get`) or callback-based (`get_with`): a callback registered before the
//! value exists is parked and fired later, so consumers can subscribe to
//! metadata a producer only learns mid-stream (content type, counts, ...).

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::task;

type Pending = Box<dyn FnOnce(Value)>;

pub struct Properties {
    values: RefCell<HashMap<String, Value>>,
    pending: RefCell<HashMap<String, Vec<Pending>>>,
}

impl Properties {
    pub fn new() -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
            pending: RefCell::new(HashMap::new()),
        }
    }

    /// Current value, if set.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values.borrow().get(name).cloned()
    }

    /// Deliver the value to `cb` on a deferred task; if the property is not
    /// set yet, park the callback until it is. Parked callbacks for one
    /// name coexist and all fire once, in registration order.
    pub fn get_with(&self, name: &str, cb: Pending) {
        if let Some(value) = self.get(name) {
            task::defer(move || cb(value));
        } else {
            self.pending
                .borrow_mut()
                .entry(name.to_string())
                .or_default()
                .push(cb);
        }
    }

    /// Store a value. Any callbacks parked for `name` are detached now and
    /// fired together in a single deferred task.
    pub fn set(&self, name: &str, value: Value) {
        self.values
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        let parked = self.pending.borrow_mut().remove(name);
        if let Some(callbacks) = parked {
            task::defer(move || {
                for cb in callbacks {
                    cb(value.clone());
                }
            });
        }
    }

    pub fn set_all(&self, entries: HashMap<String, Value>) {
        for (name, value) in entries {
            self.set(&name, value);
        }
    }

    /// Snapshot copy of all set values.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.values.borrow().clone()
    }
}

impl Default for Properties {
    fn default() -> Self {
        Self::new()
    }
}
