#![forbid(unsafe_code)]
//! rill-core: leaf primitives shared by every rill crate.
//!
//! Design intent:
//! - Everything here is single-threaded; handles are `Rc`, mutability is
//!   `Cell`/`RefCell`, and asynchronicity is the cooperative task queue in
//!   [`task`]. No mutex, no executor.
//! - This crate knows nothing about items or streams beyond the generic
//!   event bus; the stream contract lives in `rill-stream`.

pub mod config;
pub mod error;
pub mod events;
pub mod properties;
pub mod state;
pub mod task;

pub use config::StreamConfig;
pub use error::{Error, Result};
pub use events::{EventKind, Events, HookAction, ListenerId};
pub use properties::Properties;
pub use state::State;
pub use task::Signal;
