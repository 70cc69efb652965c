//! The deduplicating eviction cache.
//!
//! [`DedupCache`] classifies message keys as pass-through or duplicate and
//! remembers every occurrence of a key while it is resident. Three
//! independent policies remove entries:
//!
//! 1. **Capacity**: a new key arriving at a full cache pushes out the least
//!    recently used key.
//! 2. **Time**: a key is expired once `time_to_live` has elapsed since its
//!    *first* occurrence, however often it recurred since.
//! 3. **Memory**: once the estimated footprint reaches the limit, the oldest
//!    half of the keys (by first occurrence) is dropped.
//!
//! An evicted key that had been suppressed at least once yields a
//! [`SummaryRecord`] describing its full history. All state transitions run
//! under one mutex per cache instance.

use crate::application::metrics::Metrics;
use crate::application::ports::Clock;
use crate::domain::config::{ConfigError, DedupConfig};
use crate::domain::history::OccurrenceHistory;
use crate::domain::summary::{EvictionReason, SummaryRecord};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::{BoundedAccessCache, FirstSeenIndex};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Estimated fixed overhead of one stored string.
pub const STRING_HEADER_BYTES: u64 = 36;

/// Estimated size of one stored timestamp.
pub const TIMESTAMP_BYTES: u64 = 8;

/// Heuristic footprint of a stored key: header plus two bytes per character.
pub fn estimate_key_bytes(key: &str) -> u64 {
    STRING_HEADER_BYTES + 2 * key.chars().count() as u64
}

/// Running memory estimates for the two internal structures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Keys plus stored timestamps in the access-ordered cache
    pub cache_bytes: u64,
    /// Keys plus first-seen timestamps in the time index
    pub index_bytes: u64,
}

impl MemoryUsage {
    /// Sum of both estimates.
    pub fn total(&self) -> u64 {
        self.cache_bytes.saturating_add(self.index_bytes)
    }
}

/// Result of classifying and recording one occurrence atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Whether the occurrence was a duplicate and should be withheld
    pub duplicate: bool,
    /// Summaries produced by the evictions this occurrence triggered
    pub summaries: Vec<SummaryRecord>,
}

#[derive(Debug)]
struct CacheState {
    entries: BoundedAccessCache,
    first_seen: FirstSeenIndex,
    memory: MemoryUsage,
}

/// What the sweeps of one recorded occurrence removed.
#[derive(Debug, Default)]
struct SweepReport {
    expired: usize,
    /// Set when the memory limit was reached
    dropped: Option<usize>,
    remaining: usize,
    memory: MemoryUsage,
}

impl SweepReport {
    fn log(&self) {
        if self.expired > 0 {
            tracing::debug!(
                reason = %EvictionReason::TimeExpired,
                evicted = self.expired,
                remaining = self.remaining,
                "expired message keys"
            );
        }
        if let Some(dropped) = self.dropped {
            tracing::debug!(
                reason = %EvictionReason::MemoryPressure,
                evicted = dropped,
                remaining = self.remaining,
                cache_bytes = self.memory.cache_bytes,
                index_bytes = self.memory.index_bytes,
                "memory limit reached, dropped oldest message keys"
            );
        }
    }
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: BoundedAccessCache::new(capacity),
            first_seen: FirstSeenIndex::new(),
            memory: MemoryUsage::default(),
        }
    }

    fn is_duplicate(&self, key: &str, threshold: usize) -> bool {
        self.entries
            .peek(key)
            .is_some_and(|history| history.len() >= threshold)
    }

    fn record(
        &mut self,
        key: &str,
        now: u64,
        config: &DedupConfig,
        metrics: &Metrics,
    ) -> (Vec<SummaryRecord>, SweepReport) {
        let mut summaries = Vec::new();
        let mut report = SweepReport::default();
        let key_bytes = estimate_key_bytes(key);
        let threshold = config.threshold;

        self.memory.cache_bytes += if self.entries.contains(key) {
            TIMESTAMP_BYTES
        } else {
            key_bytes + TIMESTAMP_BYTES
        };

        if self.entries.put(key, now) {
            if let Some(evicted) = self.entries.take_eviction() {
                let evicted_bytes = estimate_key_bytes(&evicted.key);
                self.release_cache_bytes(evicted_bytes, &evicted.history);
                if self.first_seen.remove(&evicted.key).is_some() {
                    self.release_index_bytes(evicted_bytes);
                }
                metrics.record_eviction(EvictionReason::CapacityEvicted);
                if evicted.history.len() > threshold {
                    summaries.push(SummaryRecord::new(
                        EvictionReason::CapacityEvicted,
                        evicted.key,
                        evicted.history,
                        threshold,
                    ));
                }
            }
        }

        if self.first_seen.insert(key, now) {
            self.memory.index_bytes += key_bytes + TIMESTAMP_BYTES;
        }

        let ttl = config.time_to_live_millis();
        while let Some((_, first)) = self.first_seen.oldest() {
            if now.saturating_sub(first) < ttl {
                break;
            }
            self.evict_oldest(EvictionReason::TimeExpired, threshold, metrics, &mut summaries);
            report.expired += 1;
        }

        if self.memory.total() >= config.memory_limit_bytes {
            let target = self.first_seen.len() / 2;
            let mut dropped = 0usize;
            while self.first_seen.len() > target {
                if !self.evict_oldest(
                    EvictionReason::MemoryPressure,
                    threshold,
                    metrics,
                    &mut summaries,
                ) {
                    break;
                }
                dropped += 1;
            }
            report.dropped = Some(dropped);
        }

        report.remaining = self.entries.len();
        report.memory = self.memory;
        (summaries, report)
    }

    /// Evict the key seen earliest from both structures.
    fn evict_oldest(
        &mut self,
        reason: EvictionReason,
        threshold: usize,
        metrics: &Metrics,
        summaries: &mut Vec<SummaryRecord>,
    ) -> bool {
        let Some((key, _)) = self.first_seen.pop_oldest() else {
            return false;
        };
        let key_bytes = estimate_key_bytes(&key);
        self.release_index_bytes(key_bytes);

        if let Some(history) = self.entries.remove(&key) {
            self.release_cache_bytes(key_bytes, &history);
            if history.len() > threshold {
                summaries.push(SummaryRecord::new(reason, key, history, threshold));
            }
        }
        metrics.record_eviction(reason);
        true
    }

    fn flush(&mut self, threshold: usize, metrics: &Metrics) -> Vec<SummaryRecord> {
        let drained = self.entries.drain();
        self.first_seen.clear();
        self.memory = MemoryUsage::default();

        drained
            .into_iter()
            .filter_map(|(key, history)| {
                metrics.record_eviction(EvictionReason::Flush);
                (history.len() > threshold)
                    .then(|| SummaryRecord::new(EvictionReason::Flush, key, history, threshold))
            })
            .collect()
    }

    fn release_cache_bytes(&mut self, key_bytes: u64, history: &OccurrenceHistory) {
        let bytes = key_bytes + history.len() as u64 * TIMESTAMP_BYTES;
        self.memory.cache_bytes = self.memory.cache_bytes.saturating_sub(bytes);
    }

    fn release_index_bytes(&mut self, key_bytes: u64) {
        self.memory.index_bytes = self
            .memory
            .index_bytes
            .saturating_sub(key_bytes + TIMESTAMP_BYTES);
    }
}

/// Bounded key -> occurrence-history store with capacity, time and memory
/// eviction.
///
/// Share it between threads behind an `Arc`; every operation takes the
/// instance's single lock.
///
/// # Example
///
/// ```
/// use tracing_dedup::{DedupCache, DedupConfig};
///
/// let cache = DedupCache::new(DedupConfig::default().with_threshold(2)).unwrap();
///
/// for _ in 0..2 {
///     assert!(!cache.is_duplicate("disk full"));
///     cache.record_and_evict("disk full");
/// }
/// assert!(cache.is_duplicate("disk full"));
/// ```
#[derive(Debug)]
pub struct DedupCache {
    state: Mutex<CacheState>,
    config: DedupConfig,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    diagnostics: bool,
}

impl DedupCache {
    /// Create a cache reading time from the system clock.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: DedupConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a cache with a custom clock (mainly for testing).
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn with_clock(config: DedupConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(CacheState::new(config.capacity)),
            config,
            clock,
            metrics: Metrics::new(),
            diagnostics: true,
        })
    }

    /// Stop emitting `debug` events about sweeps.
    ///
    /// Required when the cache runs inside a `tracing` filter, where emitting
    /// an event would dispatch back into the filter.
    pub(crate) fn without_diagnostics(mut self) -> Self {
        self.diagnostics = false;
        self
    }

    /// Check whether `key` is resident with at least `threshold` occurrences.
    ///
    /// Pure read: neither records the occurrence nor changes recency.
    pub fn is_duplicate(&self, key: &str) -> bool {
        self.lock().is_duplicate(key, self.config.threshold)
    }

    /// Record one occurrence of `key` and run the eviction policies.
    ///
    /// Returns the summaries of evicted keys that had been suppressed, in
    /// policy order: capacity, then time, then memory.
    pub fn record_and_evict(&self, key: &str) -> Vec<SummaryRecord> {
        let mut state = self.lock();
        // Read under the lock so histories stay in arrival order
        let now = self.clock.now_millis();
        let (summaries, report) = state.record(key, now, &self.config, &self.metrics);
        drop(state);

        self.finish(&summaries, &report);
        summaries
    }

    /// Classify `key` and record it in one critical section.
    ///
    /// Equivalent to [`is_duplicate`](Self::is_duplicate) followed by
    /// [`record_and_evict`](Self::record_and_evict), without another caller
    /// being able to interleave between the two. The outcome is counted in
    /// [`Metrics`] as admitted or suppressed.
    pub fn check_and_record(&self, key: &str) -> Admission {
        let mut state = self.lock();
        let duplicate = state.is_duplicate(key, self.config.threshold);
        let now = self.clock.now_millis();
        let (summaries, report) = state.record(key, now, &self.config, &self.metrics);
        drop(state);

        if duplicate {
            self.metrics.record_suppressed();
        } else {
            self.metrics.record_admitted();
        }
        self.finish(&summaries, &report);
        Admission {
            duplicate,
            summaries,
        }
    }

    /// Drain every resident key, summarizing those that were suppressed.
    ///
    /// Leaves the cache empty. Meant to run once at orderly shutdown.
    pub fn flush_all(&self) -> Vec<SummaryRecord> {
        let summaries = self.lock().flush(self.config.threshold, &self.metrics);
        self.count_summaries(&summaries);
        summaries
    }

    /// Number of resident keys.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if no key is resident.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Maximum number of resident keys.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Check if a key is resident.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains(key)
    }

    /// Number of recorded occurrences of a resident key.
    pub fn occurrences(&self, key: &str) -> Option<usize> {
        self.lock().entries.peek(key).map(OccurrenceHistory::len)
    }

    /// Copy of a resident key's history. Does not change recency.
    pub fn history(&self, key: &str) -> Option<OccurrenceHistory> {
        self.lock().entries.peek(key).cloned()
    }

    /// First occurrence timestamp of a resident key.
    pub fn first_seen(&self, key: &str) -> Option<u64> {
        self.lock().first_seen.get(key)
    }

    /// Current memory estimates.
    pub fn memory_usage(&self) -> MemoryUsage {
        self.lock().memory
    }

    /// The validated configuration.
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Metrics this cache reports into.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn count_summaries(&self, summaries: &[SummaryRecord]) {
        if !summaries.is_empty() {
            self.metrics.record_summaries(summaries.len());
        }
    }

    // Runs after the lock is released.
    fn finish(&self, summaries: &[SummaryRecord], report: &SweepReport) {
        self.count_summaries(summaries);
        if self.diagnostics {
            report.log();
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every step leaves the state consistent, so a panic elsewhere
        // while holding the lock does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
