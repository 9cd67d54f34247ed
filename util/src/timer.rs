use std::time::{Duration, Instant};

/// Utility for keeping track of the time it took to perform some operation.
pub struct Timer {
    start_time: Instant,
}

impl Timer {
    /// Create a new `Timer`.
    pub fn now() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Reset internal timer to now.
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
    }

    /// Time elapsed since the timer was last reset.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Time left until `period` has passed since the last reset, or zero if it already has.
    pub fn remaining(&self, period: Duration) -> Duration {
        period.saturating_sub(self.elapsed())
    }
}
