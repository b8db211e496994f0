//! Stream lifecycle states.
//!
//! The discriminants are powers of two so the ordering reads as a strict
//! progression; only the ordering is contractual. Transitions are forward
//! only, and nothing moves once a stream has ended or been destroyed.

/// Lifecycle of a stream, ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    /// Constructed, initialization still pending.
    Init = 1,
    /// Producing or ready to produce.
    Open = 2,
    /// Close requested while production is in flight.
    Closing = 4,
    /// No new items will be produced; buffered items may still drain.
    Closed = 8,
    /// All items delivered, `end` emitted. Terminal.
    Ended = 16,
    /// Forcibly torn down, buffered items discarded. Terminal.
    Destroyed = 32,
}

impl State {
    /// `true` once no further production is possible (>= Closing).
    pub fn is_closed(self) -> bool {
        self >= State::Closing
    }

    /// `true` in either terminal state.
    pub fn is_done(self) -> bool {
        self >= State::Ended
    }

    /// Whether `next` is a legal transition from `self`: strictly forward,
    /// and never out of a terminal state.
    pub fn allows(self, next: State) -> bool {
        next > self && self < State::Ended
    }
}
