//! Plans, quotas and the account store collaborator.

mod plan;
mod store;

pub use plan::{generate_api_key, DailyUsage, Plan, PlanLimits, QuotaStatus};
pub use store::{Account, AccountStore, ConversionLogEntry, InMemoryAccountStore, SeedAccount};
