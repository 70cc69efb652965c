//! Field visitor for extracting the rendered message of an event.
//!
//! Deduplication keys on the text a human would read, so only the `message`
//! field is of interest. The `marker` field written by
//! [`TracingSink`](crate::infrastructure::sink::TracingSink) is collected as
//! well so that test layers can observe it.

use std::fmt;
use tracing::field::{Field, Visit};

/// Name of the field that carries an event's formatted message.
pub(crate) const MESSAGE_FIELD: &str = "message";

/// Name of the field that carries an optional marker.
pub(crate) const MARKER_FIELD: &str = "marker";

/// A visitor that extracts the `message` and `marker` fields of an event.
///
/// Values recorded through `record_debug` are rendered with `Debug`. For
/// `format_args!` messages, which is what the `tracing` macros produce, this
/// yields the plain formatted text.
#[derive(Debug, Default)]
pub(crate) struct MessageVisitor {
    message: Option<String>,
    marker: Option<String>,
}

impl MessageVisitor {
    /// Create a new message visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the visitor and return the message, if the event carried one.
    pub fn into_message(self) -> Option<String> {
        self.message
    }

    /// Consume the visitor and return both fields.
    #[allow(dead_code)]
    pub fn into_parts(self) -> (String, Option<String>) {
        (self.message.unwrap_or_default(), self.marker)
    }

    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(value),
            MARKER_FIELD => self.marker = Some(value),
            _ => {}
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if matches!(field.name(), MESSAGE_FIELD | MARKER_FIELD) {
            self.store(field, format!("{:?}", value));
        }
    }
}
