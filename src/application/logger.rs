//! Producer-facing logger that withholds repeated messages.
//!
//! [`DedupLogger`] sits between application code and a [`LogSink`]. Each
//! message is classified and recorded under the cache lock; emission happens
//! after the lock is released, so a slow sink never blocks other producers
//! from being classified.

use crate::application::cache::DedupCache;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, LogSink};
use crate::domain::config::{ConfigError, DedupConfig};
use crate::domain::summary::SummaryRecord;
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

/// Level at which shutdown summaries are emitted.
pub const FLUSH_LEVEL: Level = Level::WARN;

/// Builder for constructing a `DedupLogger`.
pub struct DedupLoggerBuilder {
    sink: Arc<dyn LogSink>,
    config: DedupConfig,
    clock: Option<Arc<dyn Clock>>,
    max_level: Level,
}

impl DedupLoggerBuilder {
    /// Replace the whole configuration.
    pub fn with_config(mut self, config: DedupConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of distinct messages tracked at once.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_capacity(capacity);
        self
    }

    /// Set how many occurrences of a message pass before it is withheld.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.config = self.config.with_threshold(threshold);
        self
    }

    /// Set how long a message stays tracked after its first occurrence.
    pub fn with_time_to_live(mut self, time_to_live: Duration) -> Self {
        self.config = self.config.with_time_to_live(time_to_live);
        self
    }

    /// Set the estimated memory footprint that triggers a sweep.
    pub fn with_memory_limit_bytes(mut self, memory_limit_bytes: u64) -> Self {
        self.config = self.config.with_memory_limit_bytes(memory_limit_bytes);
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the most verbose level that is processed.
    ///
    /// Messages more verbose than `level` are neither recorded nor emitted.
    /// Default: `TRACE` (everything is processed).
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }

    /// Build the logger.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<DedupLogger, ConfigError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let cache = DedupCache::with_clock(self.config, clock)?;

        Ok(DedupLogger {
            cache: Arc::new(cache),
            sink: self.sink,
            max_level: self.max_level,
        })
    }
}

/// Logger that passes each message through at most `threshold` times while
/// it stays resident, and reports what it withheld when the message leaves.
///
/// Clones share the same cache and sink.
///
/// # Example
///
/// ```
/// use tracing_dedup::DedupLogger;
/// use tracing::Level;
///
/// let logger = DedupLogger::builder(|level: Level, _marker: Option<&str>, text: &str| {
///     println!("{level} {text}");
/// })
/// .with_threshold(2)
/// .build()
/// .unwrap();
///
/// for _ in 0..5 {
///     logger.warn("retrying connection");
/// }
///
/// assert_eq!(logger.metrics().messages_admitted(), 2);
/// assert_eq!(logger.metrics().messages_suppressed(), 3);
///
/// // Emits a "Program Exit" summary for the withheld message
/// assert_eq!(logger.shutdown(), 1);
/// ```
#[derive(Clone)]
pub struct DedupLogger {
    cache: Arc<DedupCache>,
    sink: Arc<dyn LogSink>,
    max_level: Level,
}

impl DedupLogger {
    /// Create a builder emitting into `sink`.
    ///
    /// Defaults: capacity 500, threshold 1, time-to-live 10 seconds,
    /// memory limit 50 MiB, max level `TRACE`.
    pub fn builder<S>(sink: S) -> DedupLoggerBuilder
    where
        S: LogSink + 'static,
    {
        DedupLoggerBuilder {
            sink: Arc::new(sink),
            config: DedupConfig::default(),
            clock: None,
            max_level: Level::TRACE,
        }
    }

    /// Check whether messages at `level` are processed at all.
    pub fn is_enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    /// Log a message, withholding it if it is a duplicate.
    ///
    /// Summaries of entries evicted by this occurrence are emitted right
    /// after it, at the same level and with the same marker.
    pub fn log(&self, level: Level, marker: Option<&str>, message: &str) {
        if !self.is_enabled(level) {
            return;
        }

        let admission = self.cache.check_and_record(message);

        if !admission.duplicate {
            self.sink.emit(level, marker, message);
        }
        self.emit_summaries(level, marker, &admission.summaries);
    }

    /// Log at `TRACE`.
    pub fn trace(&self, message: &str) {
        self.log(Level::TRACE, None, message);
    }

    /// Log at `DEBUG`.
    pub fn debug(&self, message: &str) {
        self.log(Level::DEBUG, None, message);
    }

    /// Log at `INFO`.
    pub fn info(&self, message: &str) {
        self.log(Level::INFO, None, message);
    }

    /// Log at `WARN`.
    pub fn warn(&self, message: &str) {
        self.log(Level::WARN, None, message);
    }

    /// Log at `ERROR`.
    pub fn error(&self, message: &str) {
        self.log(Level::ERROR, None, message);
    }

    /// Log at `TRACE` with a marker.
    pub fn trace_with_marker(&self, marker: &str, message: &str) {
        self.log(Level::TRACE, Some(marker), message);
    }

    /// Log at `DEBUG` with a marker.
    pub fn debug_with_marker(&self, marker: &str, message: &str) {
        self.log(Level::DEBUG, Some(marker), message);
    }

    /// Log at `INFO` with a marker.
    pub fn info_with_marker(&self, marker: &str, message: &str) {
        self.log(Level::INFO, Some(marker), message);
    }

    /// Log at `WARN` with a marker.
    pub fn warn_with_marker(&self, marker: &str, message: &str) {
        self.log(Level::WARN, Some(marker), message);
    }

    /// Log at `ERROR` with a marker.
    pub fn error_with_marker(&self, marker: &str, message: &str) {
        self.log(Level::ERROR, Some(marker), message);
    }

    /// Flush every resident message and emit the summaries at `WARN`.
    ///
    /// Returns the number of summaries emitted. Calling it again only
    /// reports what was recorded since the previous call, so repeated
    /// calls are harmless.
    pub fn shutdown(&self) -> usize {
        let summaries = self.cache.flush_all();
        self.emit_summaries(FLUSH_LEVEL, None, &summaries);
        summaries.len()
    }

    /// Return a guard that calls [`shutdown`](Self::shutdown) when dropped.
    ///
    /// ```
    /// use tracing_dedup::{DedupLogger, TracingSink};
    ///
    /// let logger = DedupLogger::builder(TracingSink::new()).build().unwrap();
    /// {
    ///     let _guard = logger.flush_on_drop();
    ///     logger.error("job failed");
    ///     logger.error("job failed");
    /// } // summary for "job failed" emitted here
    /// assert!(logger.cache().is_empty());
    /// ```
    #[must_use = "the logger is flushed as soon as the guard is dropped"]
    pub fn flush_on_drop(&self) -> FlushGuard {
        FlushGuard {
            logger: self.clone(),
        }
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.cache.metrics()
    }

    fn emit_summaries(&self, level: Level, marker: Option<&str>, summaries: &[SummaryRecord]) {
        for summary in summaries {
            self.sink.emit(level, marker, &summary.format_message());
        }
    }
}

impl std::fmt::Debug for DedupLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupLogger")
            .field("cache", &self.cache)
            .field("sink", &"<sink>")
            .field("max_level", &self.max_level)
            .finish()
    }
}

/// Flushes a [`DedupLogger`] when dropped.
#[derive(Debug)]
pub struct FlushGuard {
    logger: DedupLogger,
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        self.logger.shutdown();
    }
}
