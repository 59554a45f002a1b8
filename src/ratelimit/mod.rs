//! Request admission: per-client fixed-window rate limiting.

mod clock;
mod entry;
mod identifier;
mod limiter;
mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{epoch_secs_ceil, RateLimitEntry};
pub use identifier::{client_identifier, UNKNOWN_CLIENT};
pub use limiter::{
    RateLimitDecision, RateLimitPolicy, RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS,
};
pub use sweeper::{spawn_sweeper, DEFAULT_SWEEP_INTERVAL};
