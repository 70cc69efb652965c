//! Deduplication cache configuration.
//!
//! Configuration errors are fatal at construction: an invalid value is
//! rejected before any cache exists, never surfaced later as a runtime fault.

use serde::Deserialize;
use std::time::Duration;

/// Default maximum number of resident message keys.
pub const DEFAULT_CAPACITY: usize = 500;

/// Default number of occurrences let through before suppression begins.
pub const DEFAULT_THRESHOLD: usize = 1;

/// Default time a key stays resident after its first occurrence.
pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_millis(10_000);

/// Default memory estimate limit (50 MiB).
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

/// Error returned when a deduplication configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Capacity must allow at least one resident key
    #[error("capacity must be greater than 0")]
    ZeroCapacity,
    /// Threshold must let at least one occurrence through
    #[error("threshold must be at least 1")]
    ZeroThreshold,
    /// Time-to-live must be a positive duration
    #[error("time to live must be greater than 0")]
    ZeroTimeToLive,
    /// Memory limit must be a positive byte count
    #[error("memory limit must be greater than 0 bytes")]
    ZeroMemoryLimit,
}

/// Settings for a [`DedupCache`](crate::application::cache::DedupCache).
///
/// Every field has a default and can be overridden independently, either
/// through the builder methods or by deserializing a partial document:
///
/// ```
/// use tracing_dedup::DedupConfig;
/// use std::time::Duration;
///
/// let config = DedupConfig::default()
///     .with_capacity(1_000)
///     .with_threshold(3)
///     .with_time_to_live(Duration::from_secs(60));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum number of resident message keys
    pub capacity: usize,
    /// Occurrences allowed through before suppression begins
    pub threshold: usize,
    /// Time after first occurrence before a key is force-expired
    #[serde(rename = "time_to_live_millis", with = "millis")]
    pub time_to_live: Duration,
    /// Limit on the estimated memory held by the cache and its index
    pub memory_limit_bytes: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            threshold: DEFAULT_THRESHOLD,
            time_to_live: DEFAULT_TIME_TO_LIVE,
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
        }
    }
}

impl DedupConfig {
    /// Set the maximum number of resident keys.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of occurrences let through before suppression.
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the time-to-live measured from a key's first occurrence.
    pub fn with_time_to_live(mut self, time_to_live: Duration) -> Self {
        self.time_to_live = time_to_live;
        self
    }

    /// Set the memory estimate limit in bytes.
    pub fn with_memory_limit_bytes(mut self, memory_limit_bytes: u64) -> Self {
        self.memory_limit_bytes = memory_limit_bytes;
        self
    }

    /// Check every field.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.time_to_live.is_zero() {
            return Err(ConfigError::ZeroTimeToLive);
        }
        if self.memory_limit_bytes == 0 {
            return Err(ConfigError::ZeroMemoryLimit);
        }
        Ok(())
    }

    /// Replace every invalid field with its default.
    ///
    /// For loaders that prefer falling back over failing at startup.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            capacity: if self.capacity == 0 {
                defaults.capacity
            } else {
                self.capacity
            },
            threshold: if self.threshold == 0 {
                defaults.threshold
            } else {
                self.threshold
            },
            time_to_live: if self.time_to_live.is_zero() {
                defaults.time_to_live
            } else {
                self.time_to_live
            },
            memory_limit_bytes: if self.memory_limit_bytes == 0 {
                defaults.memory_limit_bytes
            } else {
                self.memory_limit_bytes
            },
        }
    }

    /// Time-to-live in whole milliseconds, saturating at `u64::MAX`.
    pub fn time_to_live_millis(&self) -> u64 {
        u64::try_from(self.time_to_live.as_millis()).unwrap_or(u64::MAX)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
