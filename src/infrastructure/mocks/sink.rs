//! Recording log sink for testing.

use crate::application::ports::LogSink;
use std::sync::{Arc, Mutex};
use tracing::Level;

/// One message received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct EmittedMessage {
    pub level: Level,
    pub marker: Option<String>,
    pub text: String,
}

/// Sink that keeps every emitted message in memory.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    emitted: Arc<Mutex<Vec<EmittedMessage>>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all emitted messages.
    pub fn messages(&self) -> Vec<EmittedMessage> {
        self.emitted
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .clone()
    }

    /// Get only the emitted texts.
    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.text).collect()
    }

    /// Get the count of emitted messages.
    pub fn count(&self) -> usize {
        self.emitted
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .len()
    }

    /// Clear all emitted messages.
    pub fn clear(&self) {
        self.emitted
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .clear();
    }
}

impl LogSink for RecordingSink {
    fn emit(&self, level: Level, marker: Option<&str>, text: &str) {
        self.emitted
            .lock()
            .expect("RecordingSink mutex poisoned - a test thread panicked while holding the lock")
            .push(EmittedMessage {
                level,
                marker: marker.map(str::to_string),
                text: text.to_string(),
            });
    }
}
