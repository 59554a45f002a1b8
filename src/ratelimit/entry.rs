//! Per-client fixed-window entry.

use chrono::{DateTime, Duration, Utc};

/// Request count for one client inside its current window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests seen in this window, denied ones included
    pub count: u64,
    /// Instant at which the window ends
    pub window_reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    /// Start a fresh window at `now` holding the current request.
    pub fn open(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            window_reset_at: now + window,
        }
    }

    /// A window is expired strictly after its reset instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_reset_at
    }

    pub fn remaining(&self, max_requests: u64) -> u64 {
        max_requests.saturating_sub(self.count)
    }

    /// Whole seconds until the window ends, rounded up.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.window_reset_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis as u64).div_ceil(1000)
        }
    }
}

/// Epoch seconds of `at`, rounded up.
pub fn epoch_secs_ceil(at: DateTime<Utc>) -> i64 {
    let millis = at.timestamp_millis();
    millis.div_euclid(1000) + i64::from(millis.rem_euclid(1000) != 0)
}
