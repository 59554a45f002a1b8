//! Background cleanup of expired rate limit windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::limiter::RateLimiter;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Spawn a task that calls [`RateLimiter::sweep`] every `every`.
///
/// The first sweep happens one full interval after spawning.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval = ?every, "Rate limit sweeper started");

        loop {
            ticker.tick().await;

            let removed = limiter.sweep();
            debug!(
                removed = removed,
                remaining = limiter.entry_count(),
                "Swept expired rate limit entries"
            );
        }
    })
}
