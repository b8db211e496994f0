#![forbid(unsafe_code)]
//! rill-stream: the stream contract and its built-in producers.
//!
//! Design intent:
//! - `Stream<T>` is object-safe; pipelines pass `StreamRef<T>` handles and
//!   dispatch dynamically. Data flow is strictly pull, control flow is
//!   event-driven, and every deferred step runs on the `rill-core` task
//!   queue.
//! - `Buffered` + `Produce` is the extension seam: transforms in
//!   `rill-ops` are just producers that pull from another stream.

pub mod base;
pub mod buffered;
pub mod clone;
pub mod sources;
pub mod traits;

pub use base::Core;
pub use buffered::{buffered, Buffered, Produce, Sink};
pub use clone::{clone_stream, CloneStream, History};
pub use sources::{empty, from_array, integer_range, single, RangeOptions};
pub use traits::{collect, copy_properties, finish, Stream, StreamRef};
