//! Clock adapters for time operations.
//!
//! Provides SystemClock implementation for production use.
//!
//! # Testing
//!
//! See `MockClock` (in `crate::infrastructure::mocks`) for a controllable test clock.
//! Available with the `test-helpers` feature or in test builds:
//!
//! ```toml
//! [dev-dependencies]
//! tracing-dedup = { version = "*", features = ["test-helpers"] }
//! ```

use crate::application::ports::Clock;
use chrono::Utc;

/// System clock reading wall-clock time in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        // Clocks set before 1970 read as the epoch
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}
