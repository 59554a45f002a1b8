//! Billing plans, their limits, and daily usage accounting.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertFlowError, Result};

const API_KEY_PREFIX: &str = "cf_";
const API_KEY_RANDOM_LEN: usize = 32;

const MIB: usize = 1024 * 1024;

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

/// What a plan is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Conversions per UTC day; `None` is unlimited
    #[serde(default)]
    pub conversions_per_day: Option<u32>,
    /// Largest accepted conversion input, in bytes
    pub max_payload_bytes: usize,
    /// Whether the plan may call the conversion API
    #[serde(default)]
    pub api_access: bool,
}

/// Result of a successful quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaStatus {
    Unlimited,
    /// Conversions left today, the one about to run included
    Remaining(u32),
}

impl PlanLimits {
    pub fn free() -> Self {
        Self {
            conversions_per_day: Some(10),
            max_payload_bytes: MIB,
            api_access: false,
        }
    }

    pub fn pro() -> Self {
        Self {
            conversions_per_day: None,
            max_payload_bytes: 50 * MIB,
            api_access: true,
        }
    }

    pub fn check_api_access(&self) -> Result<()> {
        if self.api_access {
            Ok(())
        } else {
            Err(ConvertFlowError::Forbidden(
                "API access requires the Pro plan".to_string(),
            ))
        }
    }

    pub fn check_payload(&self, size: usize) -> Result<()> {
        if size > self.max_payload_bytes {
            return Err(ConvertFlowError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    pub fn check_quota(&self, usage: &DailyUsage, now: DateTime<Utc>) -> Result<QuotaStatus> {
        let Some(limit) = self.conversions_per_day else {
            return Ok(QuotaStatus::Unlimited);
        };

        let used = usage.effective_count(now);
        if used >= limit {
            return Err(ConvertFlowError::QuotaExceeded { limit });
        }
        Ok(QuotaStatus::Remaining(limit - used))
    }
}

/// Conversions counted against the current UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub conversions_today: u32,
    pub reset_at: DateTime<Utc>,
}

impl DailyUsage {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            conversions_today: 0,
            reset_at: next_utc_midnight(now),
        }
    }

    /// Today's count, or zero once the reset instant has passed.
    pub fn effective_count(&self, now: DateTime<Utc>) -> u32 {
        if now > self.reset_at {
            0
        } else {
            self.conversions_today
        }
    }

    /// Count one conversion, starting a new day first if needed.
    pub fn record(&mut self, now: DateTime<Utc>) {
        if now > self.reset_at {
            self.conversions_today = 0;
            self.reset_at = next_utc_midnight(now);
        }
        self.conversions_today = self.conversions_today.saturating_add(1);
    }
}

fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .map(|day| Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
        .unwrap_or_else(|| now + Duration::days(1))
}

/// Issue a new random API key.
pub fn generate_api_key() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", API_KEY_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_limits() {
        let free = PlanLimits::free();
        assert_eq!(free.conversions_per_day, Some(10));
        assert_eq!(free.max_payload_bytes, 1024 * 1024);
        assert!(!free.api_access);

        let pro = PlanLimits::pro();
        assert_eq!(pro.conversions_per_day, None);
        assert!(pro.api_access);
    }

    #[test]
    fn test_usage_resets_at_next_midnight() {
        let usage = DailyUsage::new(noon());
        assert_eq!(
            usage.reset_at,
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_record_rolls_over_day() {
        let mut usage = DailyUsage::new(noon());
        usage.record(noon());
        usage.record(noon());
        assert_eq!(usage.effective_count(noon()), 2);

        let tomorrow = noon() + Duration::days(1);
        assert_eq!(usage.effective_count(tomorrow), 0);

        usage.record(tomorrow);
        assert_eq!(usage.conversions_today, 1);
        assert_eq!(
            usage.reset_at,
            Utc.with_ymd_and_hms(2024, 3, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_quota_check() {
        let limits = PlanLimits::free();
        let mut usage = DailyUsage::new(noon());

        assert_eq!(limits.check_quota(&usage, noon()).unwrap(), QuotaStatus::Remaining(10));

        for _ in 0..10 {
            usage.record(noon());
        }
        let err = limits.check_quota(&usage, noon()).unwrap_err();
        assert!(matches!(err, ConvertFlowError::QuotaExceeded { limit: 10 }));

        // A new day frees the quota again.
        let tomorrow = noon() + Duration::days(1);
        assert!(limits.check_quota(&usage, tomorrow).is_ok());
    }

    #[test]
    fn test_unlimited_quota() {
        let mut usage = DailyUsage::new(noon());
        for _ in 0..1000 {
            usage.record(noon());
        }
        assert_eq!(
            PlanLimits::pro().check_quota(&usage, noon()).unwrap(),
            QuotaStatus::Unlimited
        );
    }

    #[test]
    fn test_payload_and_api_checks() {
        let free = PlanLimits::free();
        assert!(free.check_payload(1024 * 1024).is_ok());
        assert!(matches!(
            free.check_payload(1024 * 1024 + 1),
            Err(ConvertFlowError::PayloadTooLarge { .. })
        ));
        assert!(matches!(free.check_api_access(), Err(ConvertFlowError::Forbidden(_))));
        assert!(PlanLimits::pro().check_api_access().is_ok());
    }

    #[test]
    fn test_api_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with("cf_"));
        assert_eq!(key.len(), 35);
        assert!(key[3..].chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn test_plan_serde() {
        assert_eq!(serde_json::to_string(&Plan::Pro).unwrap(), "\"pro\"");
        let plan: Plan = serde_json::from_str("\"free\"").unwrap();
        assert_eq!(plan, Plan::Free);
    }
}
