//! Stream configuration that embedders can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Defaults for buffered streams created without explicit options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Internal buffer capacity of buffered streams. `usize::MAX` models an
    /// unbounded buffer; production is still paced by `read_ahead`.
    pub max_buffer_size: usize,

    /// Whether buffered streams start producing as soon as they open, or
    /// wait for the first `read()`.
    pub auto_start: bool,

    /// Cap on a single production request, so producers that honor the
    /// requested count never build unbounded batches in one tick.
    pub read_ahead: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: 4,
            auto_start: true,
            read_ahead: 128,
        }
    }
}

impl StreamConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RILL_MAX_BUFFER_SIZE`: buffer capacity
    /// - `RILL_AUTO_START`: `true`/`false`
    /// - `RILL_READ_AHEAD`: per-request production cap
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RILL_MAX_BUFFER_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_buffer_size = v.max(1);
            }
        }

        if let Ok(s) = std::env::var("RILL_AUTO_START") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.auto_start = v;
            }
        }

        if let Ok(s) = std::env::var("RILL_READ_AHEAD") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.read_ahead = v.max(1);
            }
        }

        cfg
    }
}
