//! # tracing-dedup
//!
//! Duplicate-message suppression with eviction summaries for the `tracing` ecosystem.
//!
//! A message is passed through the first `threshold` times it is seen while it is
//! tracked; further occurrences are withheld. Every occurrence is still timestamped,
//! and when the message leaves the cache a single summary reports how often it
//! appeared and when.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracing_dedup::{DedupLogger, TracingSink};
//! use std::time::Duration;
//!
//! // Defaults: 500 messages, threshold 1, 10s time-to-live, 50 MiB memory limit
//! let logger = DedupLogger::builder(TracingSink::new())
//!     .with_capacity(1_000)
//!     .with_threshold(2)
//!     .with_time_to_live(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//!
//! // Flush summaries when the guard goes out of scope
//! let _guard = logger.flush_on_drop();
//!
//! for _ in 0..100 {
//!     logger.warn("upstream timed out"); // logged twice
//! }
//! ```
//!
//! Or filter events emitted through the `tracing` macros directly:
//!
//! ```rust,no_run
//! use tracing_dedup::DedupFilter;
//! use tracing_subscriber::prelude::*;
//!
//! let dedup = DedupFilter::builder().with_threshold(1).build().unwrap();
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer().with_filter(dedup))
//!     .init();
//! ```
//!
//! ## Eviction Policies
//!
//! Three independent policies bound the cache. Each runs on every recorded
//! occurrence, in this order:
//!
//! - **Capacity**: a new message arriving at a full cache evicts the least recently
//!   used one.
//! - **Time**: a message is evicted once `time_to_live` has passed since its *first*
//!   occurrence, no matter how often it recurred since.
//! - **Memory**: once the estimated footprint reaches the limit, the oldest half of
//!   the messages (by first occurrence) is evicted.
//!
//! At shutdown every remaining message is flushed.
//!
//! ## Summaries
//!
//! An evicted message that was withheld at least once produces a summary:
//!
//! ```text
//! Cache Full : Evict Msg 'upstream timed out'. This Message Appears 3 Time(s) In Total and Was Logged 1 Time(s) Before
//! Timestamps at 2021-03-04 05:06:07,089, 2021-03-04 05:06:07,120, 2021-03-04 05:06:08,001
//! ```
//!
//! The label names the policy: `Cache Full`, `Time Expiration`, `Reach Memory Limit`
//! or `Program Exit`. Long timestamp lists are cut short with `...`; the last
//! timestamp is always kept.
//!
//! Messages seen no more than `threshold` times never produce a summary, since
//! nothing about them was withheld.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use tracing_dedup::{DedupLogger, TracingSink};
//! # let logger = DedupLogger::builder(TracingSink::new()).build().unwrap();
//! let snapshot = logger.metrics().snapshot();
//! println!("Admitted: {}", snapshot.messages_admitted);
//! println!("Suppressed: {}", snapshot.messages_suppressed);
//! println!("Suppression rate: {:.2}%", snapshot.suppression_rate() * 100.0);
//!
//! let memory = logger.cache().memory_usage();
//! println!("Estimated bytes: {}", memory.total());
//! ```
//!
//! ## Configuration
//!
//! [`DedupConfig`] can be built in code or deserialized with `serde`; missing
//! fields take their defaults:
//!
//! ```rust
//! # use tracing_dedup::DedupConfig;
//! # fn load(json: &str) -> DedupConfig { serde_json::from_str(json).unwrap() }
//! let config = load(r#"{ "threshold": 3, "time_to_live_millis": 60000 }"#);
//! assert_eq!(config.capacity, 500);
//! assert_eq!(config.threshold, 3);
//! ```
//!
//! Zero values are rejected with [`ConfigError`] when a cache is built. Use
//! [`DedupConfig::sanitized`] to replace them with defaults instead.
//!
//! ## Thread Safety
//!
//! All operations on one cache are serialized by a single lock. Classification
//! and recording of an occurrence happen in one critical section, and messages
//! are emitted after the lock is released.

// Domain layer - pure types
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    config::{ConfigError, DedupConfig},
    history::OccurrenceHistory,
    summary::{format_timestamp, EvictionReason, SummaryRecord},
};

pub use application::{
    cache::{Admission, DedupCache, MemoryUsage},
    logger::{DedupLogger, DedupLoggerBuilder, FlushGuard},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, LogSink},
};

pub use infrastructure::{
    clock::SystemClock,
    layer::{DedupFilter, DedupFilterBuilder, SummaryHandler},
    sink::TracingSink,
    storage::{BoundedAccessCache, FirstSeenIndex},
};
