use thiserror::Error;

/// Canonical result for the rill crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors are cloneable on purpose: a stream error re-emits on its
/// destination and fans out to every registered clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("source already has a destination")]
    AlreadyPiped,

    #[error("invalid source: {0}")]
    InvalidSource(String),

    #[error("stream aborted: {0}")]
    Aborted(String),
}
