//! Observability metrics for message deduplication.
//!
//! Provides counters about admission and eviction behavior for monitoring
//! and debugging.

use crate::domain::summary::EvictionReason;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking deduplication statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Messages passed through to the sink
    messages_admitted: AtomicU64,
    /// Messages classified as duplicates and withheld
    messages_suppressed: AtomicU64,
    /// Entries evicted because the cache was full
    capacity_evictions: AtomicU64,
    /// Entries evicted because their time-to-live elapsed
    time_evictions: AtomicU64,
    /// Entries evicted by a memory sweep
    memory_evictions: AtomicU64,
    /// Entries drained at shutdown
    flushed_entries: AtomicU64,
    /// Summary records produced
    summaries_produced: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted message.
    pub(crate) fn record_admitted(&self) {
        self.inner.messages_admitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a suppressed message.
    pub(crate) fn record_suppressed(&self) {
        self.inner
            .messages_suppressed
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record an entry leaving the cache.
    pub(crate) fn record_eviction(&self, reason: EvictionReason) {
        let counter = match reason {
            EvictionReason::CapacityEvicted => &self.inner.capacity_evictions,
            EvictionReason::TimeExpired => &self.inner.time_evictions,
            EvictionReason::MemoryPressure => &self.inner.memory_evictions,
            EvictionReason::Flush => &self.inner.flushed_entries,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record produced summaries.
    pub(crate) fn record_summaries(&self, count: usize) {
        self.inner
            .summaries_produced
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the total number of admitted messages.
    pub fn messages_admitted(&self) -> u64 {
        self.inner.messages_admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of suppressed messages.
    pub fn messages_suppressed(&self) -> u64 {
        self.inner.messages_suppressed.load(Ordering::Relaxed)
    }

    /// Get the number of evictions for one reason.
    pub fn evictions(&self, reason: EvictionReason) -> u64 {
        let counter = match reason {
            EvictionReason::CapacityEvicted => &self.inner.capacity_evictions,
            EvictionReason::TimeExpired => &self.inner.time_evictions,
            EvictionReason::MemoryPressure => &self.inner.memory_evictions,
            EvictionReason::Flush => &self.inner.flushed_entries,
        };
        counter.load(Ordering::Relaxed)
    }

    /// Get the total number of summaries produced.
    pub fn summaries_produced(&self) -> u64 {
        self.inner.summaries_produced.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_admitted: self.messages_admitted(),
            messages_suppressed: self.messages_suppressed(),
            capacity_evictions: self.evictions(EvictionReason::CapacityEvicted),
            time_evictions: self.evictions(EvictionReason::TimeExpired),
            memory_evictions: self.evictions(EvictionReason::MemoryPressure),
            flushed_entries: self.evictions(EvictionReason::Flush),
            summaries_produced: self.summaries_produced(),
        }
    }

    /// Reset all metrics to zero.
    ///
    /// Useful for testing or when starting a new monitoring period.
    pub fn reset(&self) {
        let inner = &self.inner;
        for counter in [
            &inner.messages_admitted,
            &inner.messages_suppressed,
            &inner.capacity_evictions,
            &inner.time_evictions,
            &inner.memory_evictions,
            &inner.flushed_entries,
            &inner.summaries_produced,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Messages passed through to the sink
    pub messages_admitted: u64,
    /// Messages classified as duplicates and withheld
    pub messages_suppressed: u64,
    /// Entries evicted because the cache was full
    pub capacity_evictions: u64,
    /// Entries evicted because their time-to-live elapsed
    pub time_evictions: u64,
    /// Entries evicted by a memory sweep
    pub memory_evictions: u64,
    /// Entries drained at shutdown
    pub flushed_entries: u64,
    /// Summary records produced
    pub summaries_produced: u64,
}

impl MetricsSnapshot {
    /// Calculate the suppression rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no messages have been processed.
    pub fn suppression_rate(&self) -> f64 {
        let total = self.total_messages();
        if total == 0 {
            0.0
        } else {
            self.messages_suppressed as f64 / total as f64
        }
    }

    /// Get the total number of messages processed (admitted + suppressed).
    pub fn total_messages(&self) -> u64 {
        self.messages_admitted
            .saturating_add(self.messages_suppressed)
    }

    /// Get the total number of evictions across every policy, flush excluded.
    pub fn total_evictions(&self) -> u64 {
        self.capacity_evictions
            .saturating_add(self.time_evictions)
            .saturating_add(self.memory_evictions)
    }
}
