//! `tracing` adapter for the log sink port.

use crate::application::ports::LogSink;
use tracing::Level;

/// Log sink that re-emits every message as a `tracing` event.
///
/// The level is mapped one-to-one onto the `tracing` macros. A marker, when
/// present, is attached as a `marker` field so subscribers can route on it.
///
/// # Examples
///
/// ```
/// use tracing_dedup::{DedupLogger, TracingSink};
///
/// let logger = DedupLogger::builder(TracingSink::new()).build().unwrap();
/// logger.info("connected");
/// logger.info("connected"); // withheld
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a new tracing sink.
    pub fn new() -> Self {
        Self
    }
}

// The level must be a constant in each macro invocation.
macro_rules! emit_at {
    ($level:expr, $marker:expr, $text:expr) => {
        match ($level, $marker) {
            (Level::ERROR, Some(marker)) => tracing::error!(marker, "{}", $text),
            (Level::ERROR, None) => tracing::error!("{}", $text),
            (Level::WARN, Some(marker)) => tracing::warn!(marker, "{}", $text),
            (Level::WARN, None) => tracing::warn!("{}", $text),
            (Level::INFO, Some(marker)) => tracing::info!(marker, "{}", $text),
            (Level::INFO, None) => tracing::info!("{}", $text),
            (Level::DEBUG, Some(marker)) => tracing::debug!(marker, "{}", $text),
            (Level::DEBUG, None) => tracing::debug!("{}", $text),
            (_, Some(marker)) => tracing::trace!(marker, "{}", $text),
            (_, None) => tracing::trace!("{}", $text),
        }
    };
}

impl LogSink for TracingSink {
    fn emit(&self, level: Level, marker: Option<&str>, text: &str) {
        emit_at!(level, marker, text);
    }
}
