//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of time-based expiry.
///
/// # Examples
///
/// ```
/// use tracing_dedup::infrastructure::mocks::MockClock;
/// use tracing_dedup::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::new(1_000);
///
/// // Time starts at the specified millisecond
/// assert_eq!(clock.now_millis(), 1_000);
///
/// // Advance time explicitly
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now_millis(), 11_000);
///
/// // Or set to a specific millisecond
/// clock.set(100_000);
/// assert_eq!(clock.now_millis(), 100_000);
/// ```
///
/// # Thread Safety
///
/// `MockClock` can be cloned to share across threads. All clones share the
/// same underlying time value, so advancing time in one clone affects all
/// clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_millis: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock starting at `start_millis` since the epoch.
    pub fn new(start_millis: u64) -> Self {
        Self {
            current_millis: Arc::new(AtomicU64::new(start_millis)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.current_millis.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the clock to a specific millisecond.
    pub fn set(&self, millis: u64) {
        self.current_millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        self.current_millis.load(Ordering::SeqCst)
    }
}
