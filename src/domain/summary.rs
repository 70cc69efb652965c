//! Eviction summaries.
//!
//! When a message that had been suppressed leaves the cache, its whole
//! occurrence history is condensed into one human-readable record so the
//! suppressed occurrences are not silently lost.

use crate::domain::history::OccurrenceHistory;
use chrono::{DateTime, Utc};
use std::fmt;

/// Upper bound on the rendered timestamp list plus message key, in characters.
///
/// Keeps a single summary below common downstream message-size limits.
pub const TIMESTAMP_TEXT_BUDGET: usize = 65_000;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionReason {
    /// Least-recently-used entry pushed out by a new key at full capacity.
    CapacityEvicted,
    /// Entry outlived the time-to-live measured from its first occurrence.
    TimeExpired,
    /// Entry dropped by a sweep after the memory estimate hit its limit.
    MemoryPressure,
    /// Entry drained at shutdown.
    Flush,
}

impl EvictionReason {
    /// Label used as the header of a rendered summary.
    pub fn label(&self) -> &'static str {
        match self {
            EvictionReason::CapacityEvicted => "Cache Full",
            EvictionReason::TimeExpired => "Time Expiration",
            EvictionReason::MemoryPressure => "Reach Memory Limit",
            EvictionReason::Flush => "Program Exit",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary of a suppressed message's full occurrence history.
///
/// Produced exactly once, at the moment the owning entry is evicted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    /// Why the entry was evicted
    pub reason: EvictionReason,
    /// The message key
    pub key: String,
    /// Every occurrence recorded while the key was resident
    pub history: OccurrenceHistory,
    /// How many occurrences were let through before suppression began
    pub threshold: usize,
}

impl SummaryRecord {
    /// Create a summary record.
    pub fn new(
        reason: EvictionReason,
        key: String,
        history: OccurrenceHistory,
        threshold: usize,
    ) -> Self {
        Self {
            reason,
            key,
            history,
            threshold,
        }
    }

    /// Total number of occurrences, admitted and suppressed.
    pub fn occurrences(&self) -> usize {
        self.history.len()
    }

    /// Number of occurrences that were suppressed.
    pub fn suppressed(&self) -> usize {
        self.history.len().saturating_sub(self.threshold)
    }

    /// Render the summary as a single log message.
    ///
    /// The timestamp list is cut short with `...` once it would push the
    /// message past [`TIMESTAMP_TEXT_BUDGET`]; the last timestamp is always
    /// present.
    pub fn format_message(&self) -> String {
        format!(
            "{} : Evict Msg '{}'. This Message Appears {} Time(s) In Total and Was Logged {} Time(s) Before\nTimestamps at {}",
            self.reason,
            self.key,
            self.history.len(),
            self.threshold,
            render_timestamps(&self.key, self.history.timestamps()),
        )
    }
}

impl fmt::Display for SummaryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_message())
    }
}

/// Format a millisecond epoch timestamp as `YYYY-MM-DD HH:MM:SS,mmm` (UTC).
pub fn format_timestamp(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn render_timestamps(key: &str, timestamps: &[u64]) -> String {
    let Some((last, earlier)) = timestamps.split_last() else {
        return String::new();
    };

    let key_chars = key.chars().count();
    // Rendered timestamps are ASCII, so byte length equals character count
    let mut out = String::new();
    for ts in earlier {
        if out.len() + key_chars > TIMESTAMP_TEXT_BUDGET {
            out.push_str("...");
            break;
        }
        out.push_str(&format_timestamp(*ts));
        out.push_str(", ");
    }
    out.push_str(&format_timestamp(*last));
    out
}
