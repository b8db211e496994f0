#![forbid(unsafe_code)]
//! rill-ops: transforms over the `rill-stream` contract.
//!
//! Design intent:
//! - A transform is a `Produce` strategy that pulls from a source stream;
//!   the buffered host in `rill-stream` supplies buffering, backpressure,
//!   and lifecycle.
//! - Constructors claim the source's destination slot and return `Result`,
//!   so "one destination per source" is checked where the pipeline is
//!   built.

pub mod ext;
mod link;
pub mod multi;
pub mod options;
pub mod simple;
pub mod transform;

pub use ext::StreamOps;
pub use multi::{multi_transform, MultiOptions};
pub use options::{StreamInput, TransformOptions};
pub use simple::{simple_transform, wrap};
pub use transform::TransformHandle;
