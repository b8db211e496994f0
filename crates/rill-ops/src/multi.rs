//! The multi transform: per-item sub-iterators, concatenated in order.
//!
//! Each accepted source item is turned into a transformer stream. Records
//! wait in an ordered queue; only the head transformer is read, so every
//! item of source item *i* is emitted before any item of *i + 1*.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rill_core::task::Signal;
use rill_core::{Result, StreamConfig};
use rill_stream::{empty, single, Buffered, Produce, Sink, Stream, StreamRef};

use crate::link::SourceLink;

pub struct MultiOptions<S: 'static, D: 'static> {
    pub(crate) max_buffer_size: usize,
    pub(crate) auto_start: bool,
    pub(crate) read_ahead: usize,
    pub(crate) destroy_source: bool,
    pub(crate) factory: Box<dyn Fn(S) -> Option<StreamRef<D>>>,
    pub(crate) optional: Option<Rc<dyn Fn(&S) -> D>>,
}

impl<S: 'static, D: 'static> MultiOptions<S, D> {
    /// Construct with an explicit transformer factory; a `None` from the
    /// factory stands for an empty transformer.
    pub fn with_factory(f: impl Fn(S) -> Option<StreamRef<D>> + 'static) -> Self {
        let cfg = StreamConfig::default();
        Self {
            max_buffer_size: cfg.max_buffer_size,
            auto_start: cfg.auto_start,
            read_ahead: cfg.read_ahead,
            destroy_source: true,
            factory: Box::new(f),
            optional: None,
        }
    }

    pub fn max_buffer_size(mut self, capacity: usize) -> Self {
        self.max_buffer_size = capacity.max(1);
        self
    }

    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn keep_source(mut self) -> Self {
        self.destroy_source = false;
        self
    }
}

impl<S: 'static> MultiOptions<S, S> {
    /// Default factory: a singleton over each item.
    pub fn new() -> Self {
        Self::with_factory(|item| Some(single(item)))
    }

    /// When a transformer yields nothing for its item, emit the original
    /// item instead.
    pub fn optional(mut self, optional: bool) -> Self
    where
        S: Clone,
    {
        self.optional = optional.then(|| {
            let embed: Rc<dyn Fn(&S) -> S> = Rc::new(|item: &S| item.clone());
            embed
        });
        self
    }
}

impl<S: 'static> Default for MultiOptions<S, S> {
    fn default() -> Self {
        Self::new()
    }
}

struct MultiRecord<D: 'static> {
    transformer: StreamRef<D>,
    /// Optional sentinel: still `Some` while the transformer has pushed
    /// nothing for its item.
    original: RefCell<Option<D>>,
}

struct Multi<S: 'static, D: 'static> {
    link: SourceLink<S>,
    factory: Box<dyn Fn(S) -> Option<StreamRef<D>>>,
    optional: Option<Rc<dyn Fn(&S) -> D>>,
    queue: RefCell<VecDeque<MultiRecord<D>>>,
}

impl<S: 'static, D: 'static> Produce<D> for Multi<S, D> {
    fn pull(&self, count: usize, sink: &Sink<D>, done: Signal) {
        let mut remaining = count;

        // Drop leading finished transformers; an untouched optional
        // sentinel is emitted in its place.
        loop {
            let head_finished = self
                .queue
                .borrow()
                .front()
                .map(|record| record.transformer.done());
            if head_finished != Some(true) {
                break;
            }
            if let Some(record) = self.queue.borrow_mut().pop_front() {
                if let Some(original) = record.original.borrow_mut().take() {
                    sink.push(original);
                    remaining = remaining.saturating_sub(1);
                }
            }
        }

        // Top the queue up with fresh transformers.
        while !self.link.source_done() && self.queue.borrow().len() < sink.capacity() {
            let Some(item) = self.link.read() else { break };
            let original = self.optional.as_ref().map(|embed| embed(&item));
            let transformer = (self.factory)(item).unwrap_or_else(|| empty());
            let sink_end = sink.clone();
            transformer.on_end(Box::new(move || sink_end.schedule_fill()));
            let sink_readable = sink.clone();
            transformer.on_readable(Box::new(move || sink_readable.schedule_fill()));
            let sink_error = sink.clone();
            transformer.on_error(Box::new(move |err| sink_error.emit_error(err.clone())));
            self.queue.borrow_mut().push_back(MultiRecord {
                transformer,
                original: RefCell::new(original),
            });
        }

        // Emit from the head only, to keep concatenation ordered.
        let head = self
            .queue
            .borrow()
            .front()
            .map(|record| record.transformer.clone());
        if let Some(transformer) = head {
            while remaining > 0 {
                let Some(item) = transformer.read() else { break };
                sink.push(item);
                remaining -= 1;
                if let Some(record) = self.queue.borrow().front() {
                    record.original.borrow_mut().take();
                }
            }
        }

        if self.link.source_done() && self.queue.borrow().is_empty() {
            sink.close();
        }
        done.fire();
    }

    fn end(&self, _destroyed: bool) {
        for record in self.queue.borrow_mut().drain(..) {
            record.transformer.destroy();
        }
        self.link.release();
    }
}

/// Fan each item of `source` out into its own transformer stream and
/// concatenate the results in source order.
pub fn multi_transform<S: 'static, D: 'static>(
    source: &StreamRef<S>,
    options: MultiOptions<S, D>,
) -> Result<StreamRef<D>> {
    let MultiOptions {
        max_buffer_size,
        auto_start,
        read_ahead,
        destroy_source,
        factory,
        optional,
    } = options;

    let link = SourceLink::new(destroy_source);
    link.connect(source)?;

    let producer = Multi {
        link,
        factory,
        optional,
        queue: RefCell::new(VecDeque::new()),
    };
    let cfg = StreamConfig {
        max_buffer_size,
        auto_start,
        read_ahead,
    };
    let stream = Buffered::spawn(producer, &cfg);

    if source.done() {
        stream.close();
    } else {
        // Source end only schedules a fill: the close happens once the
        // transformer queue has drained.
        let sink_end = stream.sink();
        let sink_readable = stream.sink();
        let sink_error = stream.sink();
        stream.producer().link.subscribe(
            Box::new(move || sink_end.schedule_fill()),
            Box::new(move || sink_readable.schedule_fill()),
            Box::new(move |err| sink_error.emit_error(err.clone())),
        );
    }
    Ok(stream)
}
