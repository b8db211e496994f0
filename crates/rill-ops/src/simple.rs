//! The simple transform: one source, one buffered sink, and the
//! offset/limit/filter/map/transform/prepend/append pipeline between them.

use std::cell::{Cell, RefCell};

use rill_core::task::Signal;
use rill_core::{Result, StreamConfig};
use rill_stream::{Buffered, Produce, Sink, Stream, StreamRef};

use crate::link::SourceLink;
use crate::options::{Adjunct, Op, TransformOptions};
use crate::transform::TransformHandle;

pub(crate) struct Simple<S: 'static, D: 'static> {
    link: SourceLink<S>,
    offset: Cell<usize>,
    limit: Cell<Option<usize>>,
    filter: Box<dyn Fn(&S) -> bool>,
    op: Op<S, D>,
    optional: Option<std::rc::Rc<dyn Fn(&S) -> D>>,
    prepend: RefCell<Option<Adjunct<D>>>,
    append: RefCell<Option<Adjunct<D>>>,
}

impl<S: 'static, D: 'static> Simple<S, D> {
    /// Count an accepted item against the limit; hitting zero closes the
    /// sink, which ends the pull loop after in-flight items settle.
    fn spend_limit(&self, sink: &Sink<D>) {
        if let Some(remaining) = self.limit.get() {
            let remaining = remaining.saturating_sub(1);
            self.limit.set(Some(remaining));
            if remaining == 0 {
                sink.close();
            }
        }
    }
}

impl<S: 'static, D: 'static> Produce<D> for Simple<S, D> {
    fn begin(&self, sink: &Sink<D>, done: Signal) {
        match self.prepend.borrow_mut().take() {
            Some(adjunct) => adjunct(sink, done),
            None => done.fire(),
        }
    }

    fn pull(&self, count: usize, sink: &Sink<D>, done: Signal) {
        loop {
            if sink.is_closed() || sink.pushed() >= count {
                done.fire();
                return;
            }
            let Some(item) = self.link.read() else {
                // Source has nothing right now; its readable event will
                // trigger the next fill round.
                done.fire();
                return;
            };
            if !(self.filter)(&item) {
                continue;
            }
            if self.offset.get() > 0 {
                self.offset.set(self.offset.get() - 1);
                continue;
            }
            let original = self.optional.as_ref().map(|embed| embed(&item));
            match &self.op {
                Op::Map(map) => {
                    if let Some(out) = map(item).or(original) {
                        sink.push(out);
                        self.spend_limit(sink);
                    }
                }
                Op::Transform(transform) => {
                    self.spend_limit(sink);
                    let handle = TransformHandle::new(sink.clone(), count, done, original);
                    transform(item, handle);
                    // Control resumes through the handle's continuation.
                    return;
                }
            }
        }
    }

    fn flush(&self, sink: &Sink<D>, done: Signal) {
        match self.append.borrow_mut().take() {
            Some(adjunct) => adjunct(sink, done),
            None => done.fire(),
        }
    }

    fn end(&self, _destroyed: bool) {
        self.prepend.borrow_mut().take();
        self.append.borrow_mut().take();
        self.link.release();
    }
}

/// Wire `source` through the configured transform.
pub fn simple_transform<S: 'static, D: 'static>(
    source: &StreamRef<S>,
    options: TransformOptions<S, D>,
) -> Result<StreamRef<D>> {
    let TransformOptions {
        max_buffer_size,
        auto_start,
        read_ahead,
        destroy_source,
        offset,
        limit,
        filter,
        op,
        optional,
        prepend,
        append,
    } = options;

    let link = SourceLink::new(destroy_source);
    link.connect(source)?;

    // A zero limit yields nothing at all, adjuncts included.
    let (prepend, append) = if limit == Some(0) {
        (None, None)
    } else {
        (prepend, append)
    };
    let producer = Simple {
        link,
        offset: Cell::new(offset),
        limit: Cell::new(limit),
        filter,
        op,
        optional,
        prepend: RefCell::new(prepend),
        append: RefCell::new(append),
    };
    let cfg = StreamConfig {
        max_buffer_size,
        auto_start,
        read_ahead,
    };
    let stream = Buffered::spawn(producer, &cfg);

    if source.done() || limit == Some(0) {
        stream.close();
    } else {
        let sink_end = stream.sink();
        let sink_readable = stream.sink();
        let sink_error = stream.sink();
        stream.producer().link.subscribe(
            Box::new(move || sink_end.close()),
            Box::new(move || sink_readable.schedule_fill()),
            Box::new(move |err| sink_error.emit_error(err.clone())),
        );
    }
    Ok(stream)
}

/// Identity wrapping of an existing stream behind a fresh buffer; the
/// classic use is normalizing a foreign producer to the configured
/// buffering policy.
pub fn wrap<T: 'static>(
    source: &StreamRef<T>,
    options: TransformOptions<T, T>,
) -> Result<StreamRef<T>> {
    simple_transform(source, options)
}
