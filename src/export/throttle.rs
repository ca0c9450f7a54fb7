//! Periodic pauses for long exports.

use std::time::Duration;

/// Rows emitted between pauses unless configured otherwise
pub const DEFAULT_BATCH_SIZE: u64 = 1000;

/// Pause length unless configured otherwise
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);

/// Maps the running row count to an optional pause.
///
/// This only decides; the pipeline does the waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Pause after every `batch_size` rows; zero disables throttling
    pub batch_size: u64,
    pub pause: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pause: DEFAULT_PAUSE,
        }
    }
}

impl ThrottlePolicy {
    pub fn new(batch_size: u64, pause: Duration) -> Self {
        Self { batch_size, pause }
    }

    /// A policy that never pauses
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Pause to take after `emitted` rows, if any.
    pub fn pause_after(&self, emitted: u64) -> Option<Duration> {
        if self.batch_size == 0 || emitted == 0 || self.pause.is_zero() {
            return None;
        }
        (emitted % self.batch_size == 0).then_some(self.pause)
    }
}
