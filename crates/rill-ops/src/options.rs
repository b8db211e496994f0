//! Transform configuration.
//!
//! `TransformOptions<S, D>` collects everything a simple transform can do:
//! buffering, offset/limit windows, filtering, synchronous mapping or an
//! asynchronous per-item transform, prepended/appended adjuncts, and the
//! optional-substitution rule. The identity construction (`new`) is only
//! available when the output type equals the input type; mapping and
//! transforming constructions fix the output type through their closure.

use std::rc::Rc;

use rill_core::task::Signal;
use rill_core::StreamConfig;
use rill_stream::{from_array, Sink, StreamRef};

use crate::transform::{drain_adjunct, TransformHandle};

/// A prepend/append operand: either a finite sequence or a live stream.
pub enum StreamInput<D: 'static> {
    Items(Vec<D>),
    Stream(StreamRef<D>),
}

impl<D: 'static> From<Vec<D>> for StreamInput<D> {
    fn from(items: Vec<D>) -> Self {
        StreamInput::Items(items)
    }
}

impl<D: 'static> From<StreamRef<D>> for StreamInput<D> {
    fn from(stream: StreamRef<D>) -> Self {
        StreamInput::Stream(stream)
    }
}

impl<D: 'static> StreamInput<D> {
    fn into_stream(self) -> StreamRef<D> {
        match self {
            StreamInput::Items(items) => from_array(items),
            StreamInput::Stream(stream) => stream,
        }
    }
}

/// The per-item operation of a simple transform.
pub(crate) enum Op<S: 'static, D: 'static> {
    /// Synchronous; `None` skips the item (or substitutes the original
    /// under `optional`).
    Map(Box<dyn Fn(S) -> Option<D>>),
    /// Asynchronous; the handle pushes any number of items, then settles.
    Transform(Rc<dyn Fn(S, TransformHandle<D>)>),
}

/// Drains a prepend/append operand into the transform's buffer during the
/// begin/flush step.
pub(crate) type Adjunct<D> = Box<dyn FnOnce(&Sink<D>, Signal)>;

pub struct TransformOptions<S: 'static, D: 'static> {
    pub(crate) max_buffer_size: usize,
    pub(crate) auto_start: bool,
    pub(crate) read_ahead: usize,
    pub(crate) destroy_source: bool,
    pub(crate) offset: usize,
    pub(crate) limit: Option<usize>,
    pub(crate) filter: Box<dyn Fn(&S) -> bool>,
    pub(crate) op: Op<S, D>,
    pub(crate) optional: Option<Rc<dyn Fn(&S) -> D>>,
    pub(crate) prepend: Option<Adjunct<D>>,
    pub(crate) append: Option<Adjunct<D>>,
}

impl<S: 'static, D: 'static> TransformOptions<S, D> {
    fn with_op(op: Op<S, D>) -> Self {
        let cfg = StreamConfig::default();
        Self {
            max_buffer_size: cfg.max_buffer_size,
            auto_start: cfg.auto_start,
            read_ahead: cfg.read_ahead,
            destroy_source: true,
            offset: 0,
            limit: None,
            filter: Box::new(|_| true),
            op,
            optional: None,
            prepend: None,
            append: None,
        }
    }

    /// Synchronous mapping construction; a `None` result skips the item.
    pub fn mapping(f: impl Fn(S) -> Option<D> + 'static) -> Self {
        Self::with_op(Op::Map(Box::new(f)))
    }

    /// Asynchronous transform construction.
    pub fn transforming(f: impl Fn(S, TransformHandle<D>) + 'static) -> Self {
        Self::with_op(Op::Transform(Rc::new(f)))
    }

    /// Replace the per-item operation with a map.
    pub fn map(mut self, f: impl Fn(S) -> Option<D> + 'static) -> Self {
        self.op = Op::Map(Box::new(f));
        self
    }

    /// Replace the per-item operation with an asynchronous transform.
    pub fn transform(mut self, f: impl Fn(S, TransformHandle<D>) + 'static) -> Self {
        self.op = Op::Transform(Rc::new(f));
        self
    }

    pub fn filter(mut self, f: impl Fn(&S) -> bool + 'static) -> Self {
        self.filter = Box::new(f);
        self
    }

    /// Skip the first `n` accepted items.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Accept at most `n` items, then close.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn max_buffer_size(mut self, capacity: usize) -> Self {
        self.max_buffer_size = capacity.max(1);
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Keep the source alive when this transform ends.
    pub fn keep_source(mut self) -> Self {
        self.destroy_source = false;
        self
    }

    /// Apply buffering defaults from a [`StreamConfig`].
    pub fn configured(mut self, cfg: &StreamConfig) -> Self {
        self.max_buffer_size = cfg.max_buffer_size.max(1);
        self.auto_start = cfg.auto_start;
        self.read_ahead = cfg.read_ahead.max(1);
        self
    }

    /// Emit `input` before the transformed items.
    pub fn prepend(mut self, input: impl Into<StreamInput<D>>) -> Self
    where
        D: Clone,
    {
        let stream = input.into().into_stream();
        self.prepend = Some(Box::new(move |sink, done| drain_adjunct(stream, sink, done)));
        self
    }

    /// Emit `input` after the transformed items.
    pub fn append(mut self, input: impl Into<StreamInput<D>>) -> Self
    where
        D: Clone,
    {
        let stream = input.into().into_stream();
        self.append = Some(Box::new(move |sink, done| drain_adjunct(stream, sink, done)));
        self
    }
}

impl<S: 'static> TransformOptions<S, S> {
    /// Identity construction: items pass through unchanged until a map or
    /// transform replaces the operation.
    pub fn new() -> Self {
        Self::with_op(Op::Map(Box::new(|item| Some(item))))
    }
}

impl<S: Clone + 'static> TransformOptions<S, S> {
    /// When the operation produces nothing for an item, push the original
    /// item instead of skipping it.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional.then(|| {
            let embed: Rc<dyn Fn(&S) -> S> = Rc::new(|item: &S| item.clone());
            embed
        });
        self
    }
}

impl<S: 'static> Default for TransformOptions<S, S> {
    fn default() -> Self {
        Self::new()
    }
}
