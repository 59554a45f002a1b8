use std::sync::Arc;

use tracing::info;

use crate::accounts::{AccountStore, InMemoryAccountStore};
use crate::config::{ConvertFlowConfig, PlansConfig};
use crate::error::Result;
use crate::ratelimit::{Clock, RateLimiter};

/// Whether conversions are checked against an account store.
///
/// Decided once at startup. `Unconfigured` accepts any non-empty API key.
#[derive(Clone)]
pub enum Accounts {
    Unconfigured,
    Configured(Arc<dyn AccountStore>),
}

// app's shared state
pub struct AppState {
    pub rate_limiter: Arc<RateLimiter>,
    pub accounts: Accounts,
    pub plans: PlansConfig,
    pub clock: Arc<dyn Clock>,
    /// Paths under this prefix go through admission control
    pub api_prefix: String,
}

impl AppState {
    pub fn new(
        rate_limiter: Arc<RateLimiter>,
        accounts: Accounts,
        plans: PlansConfig,
        clock: Arc<dyn Clock>,
        api_prefix: impl Into<String>,
    ) -> Self {
        Self {
            rate_limiter,
            accounts,
            plans,
            clock,
            api_prefix: api_prefix.into(),
        }
    }

    pub fn from_config(config: &ConvertFlowConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let policy = config.rate_limiting.policy()?;
        let rate_limiter = Arc::new(RateLimiter::new(policy, Arc::clone(&clock)));

        let accounts = if config.accounts.enabled {
            let store = InMemoryAccountStore::from_seed(&config.accounts.seed, clock.now());
            info!(accounts = store.account_count(), "Account store configured");
            Accounts::Configured(Arc::new(store))
        } else {
            info!("No account store configured; accepting any API key");
            Accounts::Unconfigured
        };

        Ok(Self::new(
            rate_limiter,
            accounts,
            config.plans.clone(),
            clock,
            config.rate_limiting.path_prefix.clone(),
        ))
    }
}
