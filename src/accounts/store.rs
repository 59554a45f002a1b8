//! Account storage seam.
//!
//! Persistence is owned by an external service; the conversion API only
//! needs to look accounts up by key and append to the conversion log.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::plan::{generate_api_key, DailyUsage, Plan, PlanLimits, QuotaStatus};
use crate::convert::Direction;
use crate::error::{ConvertFlowError, Result};

/// A customer account as seen by the conversion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub plan: Plan,
    pub api_key: String,
    pub usage: DailyUsage,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(plan: Plan, api_key: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            plan,
            api_key,
            usage: DailyUsage::new(now),
            created_at: now,
        }
    }
}

/// One row of the append-only conversion log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionLogEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub direction: Direction,
    pub input_size: usize,
    pub created_at: DateTime<Utc>,
}

/// Backend holding accounts and their conversion history.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Look an account up by API key.
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Account>>;

    /// Check the account's daily quota and count one conversion against it
    /// in a single step, so concurrent callers can never overshoot the limit.
    async fn reserve_conversion(
        &self,
        account_id: Uuid,
        limits: &PlanLimits,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus>;

    /// Append a completed conversion to the log.
    async fn record_conversion(
        &self,
        account_id: Uuid,
        direction: Direction,
        input_size: usize,
        at: DateTime<Utc>,
    ) -> Result<ConversionLogEntry>;
}

/// Seed data for [`InMemoryAccountStore::from_seed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedAccount {
    pub api_key: String,
    pub plan: Plan,
}

/// Process-local [`AccountStore`].
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    /// API key to account id
    keys: RwLock<HashMap<String, Uuid>>,
    log: RwLock<Vec<ConversionLogEntry>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: &[SeedAccount], now: DateTime<Utc>) -> Self {
        let store = Self::new();
        for account in seed {
            store.insert(Account::new(account.plan, account.api_key.clone(), now));
        }
        store
    }

    /// Create an account with a freshly generated API key.
    pub fn register(&self, plan: Plan, now: DateTime<Utc>) -> Account {
        let account = Account::new(plan, generate_api_key(), now);
        self.insert(account.clone());
        account
    }

    pub fn insert(&self, account: Account) {
        debug!(account_id = %account.id, plan = ?account.plan, "Adding account");
        self.keys.write().insert(account.api_key.clone(), account.id);
        self.accounts.write().insert(account.id, account);
    }

    pub fn get(&self, account_id: Uuid) -> Option<Account> {
        self.accounts.read().get(&account_id).cloned()
    }

    /// Log entries for one account, oldest first.
    pub fn conversions_for(&self, account_id: Uuid) -> Vec<ConversionLogEntry> {
        self.log
            .read()
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }
}

fn unknown_account(account_id: Uuid) -> ConvertFlowError {
    ConvertFlowError::Store(format!("unknown account {}", account_id))
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Account>> {
        let id = match self.keys.read().get(api_key) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.get(id))
    }

    async fn reserve_conversion(
        &self,
        account_id: Uuid,
        limits: &PlanLimits,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus> {
        // Check and count under one write lock.
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&account_id)
            .ok_or_else(|| unknown_account(account_id))?;

        let quota = limits.check_quota(&account.usage, now)?;
        account.usage.record(now);
        Ok(quota)
    }

    async fn record_conversion(
        &self,
        account_id: Uuid,
        direction: Direction,
        input_size: usize,
        at: DateTime<Utc>,
    ) -> Result<ConversionLogEntry> {
        if !self.accounts.read().contains_key(&account_id) {
            return Err(unknown_account(account_id));
        }

        let entry = ConversionLogEntry {
            id: Uuid::new_v4(),
            account_id,
            direction,
            input_size,
            created_at: at,
        };
        self.log.write().push(entry.clone());

        Ok(entry)
    }
}
