//! The source side of a transform.
//!
//! A transform holds exactly one source. Connecting claims the source's
//! destination slot (a source feeds at most one destination); releasing
//! detaches the listeners, frees the slot, and by default destroys the
//! source, since the transform owned it.

use std::cell::{Cell, RefCell};

use rill_core::events::{EventKind, ListenerId};
use rill_core::{Error, Result};
use rill_stream::StreamRef;

pub(crate) struct SourceLink<S: 'static> {
    source: RefCell<Option<StreamRef<S>>>,
    listener_ids: Cell<Option<(ListenerId, ListenerId, ListenerId)>>,
    destroy_source: bool,
}

impl<S: 'static> SourceLink<S> {
    pub fn new(destroy_source: bool) -> Self {
        Self {
            source: RefCell::new(None),
            listener_ids: Cell::new(None),
            destroy_source,
        }
    }

    /// Claim the source. Fails when it already feeds a destination.
    pub fn connect(&self, source: &StreamRef<S>) -> Result<()> {
        source.core().claim_destination()?;
        *self.source.borrow_mut() = Some(source.clone());
        Ok(())
    }

    /// Subscribe the transform's reactions to the source's events.
    pub fn subscribe(
        &self,
        on_end: Box<dyn FnMut()>,
        on_readable: Box<dyn FnMut()>,
        on_error: Box<dyn FnMut(&Error)>,
    ) {
        if let Some(source) = &*self.source.borrow() {
            let ids = (
                source.on_end(on_end),
                source.on_readable(on_readable),
                source.on_error(on_error),
            );
            self.listener_ids.set(Some(ids));
        }
    }

    /// Pull one item from the source, if still connected.
    pub fn read(&self) -> Option<S> {
        let source = self.source.borrow().clone();
        source.and_then(|source| source.read())
    }

    /// Whether the source has reached a terminal state (a released link
    /// counts as done).
    pub fn source_done(&self) -> bool {
        self.source
            .borrow()
            .as_ref()
            .map_or(true, |source| source.done())
    }

    /// Detach from the source: unsubscribe, free its destination slot,
    /// and destroy it unless it was marked kept. Idempotent.
    pub fn release(&self) {
        let Some(source) = self.source.borrow_mut().take() else {
            return;
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(destroy = self.destroy_source, "detaching transform source");
        if let Some((end_id, readable_id, error_id)) = self.listener_ids.take() {
            source.off(EventKind::End, end_id);
            source.off(EventKind::Readable, readable_id);
            source.off(EventKind::Error, error_id);
        }
        source.core().release_destination();
        if self.destroy_source {
            source.destroy();
        }
    }
}
