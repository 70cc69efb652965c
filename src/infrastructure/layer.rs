//! Tracing integration layer.
//!
//! Provides a per-layer `Filter` that withholds repeated log events. Events
//! are keyed by their rendered `message` field, so `info!("user {}", id)`
//! with different ids yields distinct keys. Events without a `message`
//! field pass untouched and are not recorded.

use crate::application::{cache::DedupCache, metrics::Metrics, ports::Clock};
use crate::domain::config::{ConfigError, DedupConfig};
use crate::domain::summary::SummaryRecord;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::visitor::MessageVisitor;

use std::sync::Arc;
use std::time::Duration;
use tracing::{Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};

/// Function type for handling eviction summaries.
///
/// Called synchronously, after the cache lock is released, for every summary
/// produced while filtering an event or flushing. It must not assume it runs
/// on any particular thread.
pub type SummaryHandler = Arc<dyn Fn(&SummaryRecord) + Send + Sync + 'static>;

/// Builder for constructing a `DedupFilter`.
pub struct DedupFilterBuilder {
    config: DedupConfig,
    clock: Option<Arc<dyn Clock>>,
    summary_handler: Option<SummaryHandler>,
}

impl DedupFilterBuilder {
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

    /// Receive the summaries of evicted messages.
    ///
    /// Without a handler summaries are discarded and only counted in
    /// [`Metrics`]. The handler should not log through the subscriber this
    /// filter is installed on, since that would re-enter the filter.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tracing_dedup::{DedupFilter, SummaryRecord};
    /// # use std::sync::Arc;
    /// let filter = DedupFilter::builder()
    ///     .with_summary_handler(Arc::new(|summary: &SummaryRecord| {
    ///         eprintln!("{}", summary.format_message());
    ///     }))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn with_summary_handler(mut self, handler: SummaryHandler) -> Self {
        self.summary_handler = Some(handler);
        self
    }

    /// Build the filter.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<DedupFilter, ConfigError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let cache = DedupCache::with_clock(self.config, clock)?.without_diagnostics();

        Ok(DedupFilter {
            cache: Arc::new(cache),
            summary_handler: self.summary_handler,
        })
    }
}

/// A `tracing_subscriber` filter that withholds repeated messages.
///
/// The first `threshold` occurrences of a message are let through; further
/// occurrences are rejected until the message is evicted from the cache.
///
/// Clones share the same cache, so a clone kept outside the subscriber can
/// inspect state or flush at shutdown.
///
/// # Example
///
/// ```
/// use tracing_dedup::DedupFilter;
/// use tracing_subscriber::layer::SubscriberExt;
/// use tracing_subscriber::Layer;
///
/// let filter = DedupFilter::builder().with_threshold(2).build().unwrap();
/// let subscriber = tracing_subscriber::registry()
///     .with(tracing_subscriber::fmt::layer().with_filter(filter.clone()));
///
/// tracing::subscriber::with_default(subscriber, || {
///     for _ in 0..5 {
///         tracing::info!("disk almost full");
///     }
/// });
///
/// assert_eq!(filter.metrics().messages_admitted(), 2);
/// assert_eq!(filter.metrics().messages_suppressed(), 3);
/// ```
#[derive(Clone)]
pub struct DedupFilter {
    cache: Arc<DedupCache>,
    summary_handler: Option<SummaryHandler>,
}

impl DedupFilter {
    /// Create a builder for configuring the filter.
    ///
    /// Defaults: capacity 500, threshold 1, time-to-live 10 seconds,
    /// memory limit 50 MiB, no summary handler.
    pub fn builder() -> DedupFilterBuilder {
        DedupFilterBuilder {
            config: DedupConfig::default(),
            clock: None,
            summary_handler: None,
        }
    }

    /// Create a filter with default settings.
    ///
    /// # Panics
    /// This method cannot panic because all default values are valid.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("default configuration is always valid")
    }

    /// Decide whether a message should pass, recording the occurrence.
    pub fn should_allow(&self, message: &str) -> bool {
        let admission = self.cache.check_and_record(message);
        self.dispatch(&admission.summaries);
        !admission.duplicate
    }

    /// Drain the cache, handing every qualifying summary to the handler.
    ///
    /// Returns the number of summaries produced.
    pub fn flush(&self) -> usize {
        let summaries = self.cache.flush_all();
        self.dispatch(&summaries);
        summaries.len()
    }

    /// Get the underlying cache.
    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.cache.metrics()
    }

    fn dispatch(&self, summaries: &[SummaryRecord]) {
        if let Some(handler) = &self.summary_handler {
            for summary in summaries {
                handler(summary);
            }
        }
    }
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DedupFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupFilter")
            .field("cache", &self.cache)
            .field(
                "summary_handler",
                &self.summary_handler.as_ref().map(|_| "<fn>"),
            )
            .finish()
    }
}

impl<Sub> Filter<Sub> for DedupFilter
where
    Sub: Subscriber,
{
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, Sub>) -> bool {
        // Spans and callsite interest always pass; the decision needs the message
        true
    }

    fn event_enabled(&self, event: &tracing::Event<'_>, _cx: &Context<'_, Sub>) -> bool {
        let mut visitor = MessageVisitor::new();
        event.record(&mut visitor);
        match visitor.into_message() {
            Some(message) => self.should_allow(&message),
            // Structured events without a message have nothing to key on
            None => true,
        }
    }
}
