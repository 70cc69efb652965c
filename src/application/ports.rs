//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use tracing::Level;

/// Port for obtaining the current wall-clock time.
///
/// Timestamps are milliseconds since the Unix epoch. They are stored in
/// occurrence histories and rendered in summaries, so they must be wall-clock
/// values rather than monotonic instants.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Port for emitting log text to whatever sink the caller chose.
///
/// Called once per admitted message and once per rendered summary. The
/// deduplication core never decides routing or formatting beyond the summary
/// text itself.
pub trait LogSink: Send + Sync {
    /// Emit one message.
    fn emit(&self, level: Level, marker: Option<&str>, text: &str);
}

impl<F> LogSink for F
where
    F: Fn(Level, Option<&str>, &str) + Send + Sync,
{
    fn emit(&self, level: Level, marker: Option<&str>, text: &str) {
        self(level, marker, text)
    }
}
