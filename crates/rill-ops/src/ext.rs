//! Combinator surface on stream handles.
//!
//! Every combinator builds a transform over `self` and returns the new
//! stream; attaching to a source that already feeds a destination is a
//! programming error surfaced as `Error::AlreadyPiped`.

use rill_core::Result;
use rill_stream::{clone_stream, StreamRef};

use crate::multi::{multi_transform, MultiOptions};
use crate::options::{StreamInput, TransformOptions};
use crate::simple::simple_transform;

pub trait StreamOps<T: 'static> {
    /// Transform every item with `f`.
    fn map<D, F>(&self, f: F) -> Result<StreamRef<D>>
    where
        D: 'static,
        F: Fn(T) -> D + 'static;

    /// Keep only items satisfying `f`.
    fn filter<F>(&self, f: F) -> Result<StreamRef<T>>
    where
        F: Fn(&T) -> bool + 'static;

    /// Full transform with explicit options.
    fn transform<D: 'static>(&self, options: TransformOptions<T, D>) -> Result<StreamRef<D>>;

    /// Emit `input` before this stream's items.
    fn prepend<I>(&self, input: I) -> Result<StreamRef<T>>
    where
        T: Clone,
        I: Into<StreamInput<T>>;

    /// Emit `input` after this stream's items.
    fn append<I>(&self, input: I) -> Result<StreamRef<T>>
    where
        T: Clone,
        I: Into<StreamInput<T>>;

    /// Emit `before`, then this stream's items, then `after`.
    fn surround<B, A>(&self, before: B, after: A) -> Result<StreamRef<T>>
    where
        T: Clone,
        B: Into<StreamInput<T>>,
        A: Into<StreamInput<T>>;

    /// Skip the first `n` items.
    fn skip(&self, n: usize) -> Result<StreamRef<T>>;

    /// Emit at most `n` items.
    fn take(&self, n: usize) -> Result<StreamRef<T>>;

    /// Emit items at positions `start..=end`.
    fn range(&self, start: usize, end: usize) -> Result<StreamRef<T>>;

    /// Fan each item out into its own stream, concatenated in order.
    fn flat_map<D, F>(&self, f: F) -> Result<StreamRef<D>>
    where
        D: 'static,
        F: Fn(T) -> StreamRef<D> + 'static;

    /// A new consumer sharing this stream's items through the replay
    /// history.
    fn clone_stream(&self) -> Result<StreamRef<T>>
    where
        T: Clone;
}

impl<T: 'static> StreamOps<T> for StreamRef<T> {
    fn map<D, F>(&self, f: F) -> Result<StreamRef<D>>
    where
        D: 'static,
        F: Fn(T) -> D + 'static,
    {
        simple_transform(self, TransformOptions::mapping(move |item| Some(f(item))))
    }

    fn filter<F>(&self, f: F) -> Result<StreamRef<T>>
    where
        F: Fn(&T) -> bool + 'static,
    {
        simple_transform(self, TransformOptions::mapping(Some).filter(f))
    }

    fn transform<D: 'static>(&self, options: TransformOptions<T, D>) -> Result<StreamRef<D>> {
        simple_transform(self, options)
    }

    fn prepend<I>(&self, input: I) -> Result<StreamRef<T>>
    where
        T: Clone,
        I: Into<StreamInput<T>>,
    {
        simple_transform(self, TransformOptions::mapping(Some).prepend(input))
    }

    fn append<I>(&self, input: I) -> Result<StreamRef<T>>
    where
        T: Clone,
        I: Into<StreamInput<T>>,
    {
        simple_transform(self, TransformOptions::mapping(Some).append(input))
    }

    fn surround<B, A>(&self, before: B, after: A) -> Result<StreamRef<T>>
    where
        T: Clone,
        B: Into<StreamInput<T>>,
        A: Into<StreamInput<T>>,
    {
        simple_transform(
            self,
            TransformOptions::mapping(Some).prepend(before).append(after),
        )
    }

    fn skip(&self, n: usize) -> Result<StreamRef<T>> {
        simple_transform(self, TransformOptions::mapping(Some).offset(n))
    }

    fn take(&self, n: usize) -> Result<StreamRef<T>> {
        simple_transform(self, TransformOptions::mapping(Some).limit(n))
    }

    fn range(&self, start: usize, end: usize) -> Result<StreamRef<T>> {
        let limit = end.saturating_add(1).saturating_sub(start);
        simple_transform(
            self,
            TransformOptions::mapping(Some).offset(start).limit(limit),
        )
    }

    fn flat_map<D, F>(&self, f: F) -> Result<StreamRef<D>>
    where
        D: 'static,
        F: Fn(T) -> StreamRef<D> + 'static,
    {
        multi_transform(self, MultiOptions::with_factory(move |item| Some(f(item))))
    }

    fn clone_stream(&self) -> Result<StreamRef<T>>
    where
        T: Clone,
    {
        clone_stream(self)
    }
}
