//! Fixed-window rate limiter keyed by client identifier.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::entry::RateLimitEntry;
use crate::error::{ConvertFlowError, Result};

/// Default number of requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;
/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Limit and window length applied to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_requests: u64,
    window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u64, window: std::time::Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(ConvertFlowError::Config(
                "rate limit max_requests must be at least 1".to_string(),
            ));
        }
        let window = Duration::from_std(window)
            .ok()
            .filter(|w| *w > Duration::zero())
            .ok_or_else(|| {
                ConvertFlowError::Config(format!("invalid rate limit window: {:?}", window))
            })?;

        Ok(Self {
            max_requests,
            window,
        })
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: Duration::seconds(DEFAULT_WINDOW_SECS as i64),
        }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    /// Requests counted in the window so far, this one included
    pub count: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub retry_after_secs: u64,
}

impl RateLimitDecision {
    /// Turn a denial into [`ConvertFlowError::RateLimited`].
    pub fn into_result(self) -> Result<Self> {
        if self.allowed {
            Ok(self)
        } else {
            Err(ConvertFlowError::RateLimited {
                limit: self.limit,
                reset_at: self.reset_at,
                retry_after_secs: self.retry_after_secs,
            })
        }
    }
}

/// In-memory fixed-window rate limiter.
///
/// State lives in this process only. Each check holds the shard lock of the
/// client's entry while it reads the window and bumps the count, so
/// concurrent requests from one client never lose updates.
pub struct RateLimiter {
    /// Windows indexed by client identifier
    entries: DashMap<String, RateLimitEntry>,
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
            clock,
        }
    }

    /// Count a request from `identifier` and decide whether to admit it.
    ///
    /// Denied requests are counted too, so a client that keeps retrying
    /// stays over the limit until its window rolls over.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        let now = self.clock.now();

        trace!(client = %identifier, "Checking rate limit");

        let decision = match self.entries.entry(identifier.to_string()) {
            Entry::Vacant(vacant) => {
                let entry = RateLimitEntry::open(now, self.policy.window);
                debug!(
                    client = %identifier,
                    reset_at = %entry.window_reset_at,
                    "Opening rate limit window"
                );
                let decision = self.decide(&entry, now);
                vacant.insert(entry);
                decision
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    *entry = RateLimitEntry::open(now, self.policy.window);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
                self.decide(entry, now)
            }
        };

        if !decision.allowed {
            debug!(
                client = %identifier,
                count = decision.count,
                limit = decision.limit,
                "Rate limit exceeded"
            );
        }

        decision
    }

    fn decide(&self, entry: &RateLimitEntry, now: DateTime<Utc>) -> RateLimitDecision {
        RateLimitDecision {
            allowed: entry.count <= self.policy.max_requests,
            limit: self.policy.max_requests,
            count: entry.count,
            remaining: entry.remaining(self.policy.max_requests),
            reset_at: entry.window_reset_at,
            retry_after_secs: entry.retry_after_secs(now),
        }
    }

    /// Drop every entry whose window has already ended.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    /// Current count for an identifier, if it has an entry.
    pub fn count_for(&self, identifier: &str) -> Option<u64> {
        self.entries.get(identifier).map(|entry| entry.count)
    }

    /// Number of tracked identifiers.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitPolicy::default(), Arc::new(SystemClock))
    }
}
