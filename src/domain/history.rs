//! Per-message occurrence history.
//!
//! Every time a message key is recorded while it is resident in the cache,
//! its timestamp is appended here. The history lives exactly as long as the
//! cache entry that owns it and is handed to the summary renderer when the
//! entry is evicted.

/// Ordered record of every occurrence timestamp observed for one message key.
///
/// Timestamps are wall-clock milliseconds since the Unix epoch. They are
/// appended in the order the cache records them, so the sequence is
/// non-decreasing as long as the clock is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceHistory {
    timestamps: Vec<u64>,
}

impl OccurrenceHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history holding a single first occurrence.
    pub fn starting_at(timestamp_ms: u64) -> Self {
        Self {
            timestamps: vec![timestamp_ms],
        }
    }

    /// Append an occurrence.
    pub fn record(&mut self, timestamp_ms: u64) {
        self.timestamps.push(timestamp_ms);
    }

    /// Number of recorded occurrences.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if no occurrence has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// All recorded timestamps, oldest first.
    pub fn timestamps(&self) -> &[u64] {
        &self.timestamps
    }

    /// Timestamp of the first recorded occurrence.
    pub fn first(&self) -> Option<u64> {
        self.timestamps.first().copied()
    }

    /// Timestamp of the most recent occurrence.
    pub fn last(&self) -> Option<u64> {
        self.timestamps.last().copied()
    }
}

impl From<Vec<u64>> for OccurrenceHistory {
    fn from(timestamps: Vec<u64>) -> Self {
        Self { timestamps }
    }
}
