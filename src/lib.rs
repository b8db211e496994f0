#![forbid(unsafe_code)]
//! rill: pull-based asynchronous iterators.
//!
//! Producers, transforms, and consumers exchange items through a uniform
//! event-driven state machine with internal buffering and backpressure.
//! Data flow is strictly pull; control flow is event-driven (`readable`,
//! `data`, `end`, `error`); and all asynchronicity runs on a cooperative
//! deferred-task queue ([`task`]).
//!
//! ```
//! use rill::prelude::*;
//!
//! let doubled = rill::from_array(vec![1, 2, 3]).map(|n| n * 2).unwrap();
//! assert_eq!(rill::collect(&doubled), vec![2, 4, 6]);
//! ```

pub use rill_core::config::StreamConfig;
pub use rill_core::error::{Error, Result};
pub use rill_core::events::{EventKind, ListenerId};
pub use rill_core::state::State;
pub use rill_core::task;
pub use rill_core::task::Signal;

pub use rill_stream::{
    buffered, clone_stream, collect, copy_properties, empty, from_array, integer_range, single,
    Buffered, Core, Produce, RangeOptions, Sink, Stream, StreamRef,
};

pub use rill_ops::{
    multi_transform, simple_transform, wrap, MultiOptions, StreamInput, StreamOps,
    TransformHandle, TransformOptions,
};

/// Convenient re-exports for downstream users.
pub mod prelude {
    pub use crate::{
        collect, empty, from_array, integer_range, single, wrap, EventKind, MultiOptions,
        RangeOptions, State, Stream, StreamOps, StreamRef, TransformOptions,
    };
}
