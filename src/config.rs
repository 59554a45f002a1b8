//! Configuration management for ConvertFlow.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::accounts::{Plan, PlanLimits, SeedAccount};
use crate::error::{ConvertFlowError, Result};
use crate::ratelimit::{RateLimitPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_SWEEP_INTERVAL, DEFAULT_WINDOW_SECS};

/// Prefix of environment variables overriding file settings,
/// e.g. `CONVERTFLOW__RATE_LIMITING__MAX_REQUESTS=50`.
const ENV_PREFIX: &str = "CONVERTFLOW";

/// Main configuration for the ConvertFlow service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertFlowConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Per-plan limits
    #[serde(default)]
    pub plans: PlansConfig,

    /// Account store configuration
    #[serde(default)]
    pub accounts: AccountsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Seconds between sweeps of expired windows
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Requests whose path falls under this prefix are rate limited
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            path_prefix: default_path_prefix(),
        }
    }
}

fn default_max_requests() -> u64 {
    DEFAULT_MAX_REQUESTS
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW_SECS
}

fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

fn default_path_prefix() -> String {
    "/api".to_string()
}

impl RateLimitingConfig {
    pub fn policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(self.max_requests, Duration::from_secs(self.window_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Limits for each plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlansConfig {
    #[serde(default = "PlanLimits::free")]
    pub free: PlanLimits,

    #[serde(default = "PlanLimits::pro")]
    pub pro: PlanLimits,
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            free: PlanLimits::free(),
            pro: PlanLimits::pro(),
        }
    }
}

impl PlansConfig {
    pub fn limits(&self, plan: Plan) -> &PlanLimits {
        match plan {
            Plan::Free => &self.free,
            Plan::Pro => &self.pro,
        }
    }

    pub fn largest_payload_bytes(&self) -> usize {
        self.free.max_payload_bytes.max(self.pro.max_payload_bytes)
    }
}

/// Account store configuration.
///
/// With `enabled: false` the API runs without an account store: any
/// non-empty bearer key is accepted and no plan limits apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Accounts loaded into the in-memory store at startup
    #[serde(default)]
    pub seed: Vec<SeedAccount>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ConvertFlowConfig {
    /// Load configuration from a YAML file path.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ConvertFlowConfig =
            serde_yaml::from_str(yaml).map_err(|e| ConvertFlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional YAML file layered under
    /// `CONVERTFLOW__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: ConvertFlowConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConvertFlowError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.rate_limiting.policy()?;

        if self.rate_limiting.sweep_interval_secs == 0 {
            return Err(ConvertFlowError::Config(
                "rate_limiting.sweep_interval_secs must be at least 1".to_string(),
            ));
        }

        if !self.rate_limiting.path_prefix.starts_with('/') {
            return Err(ConvertFlowError::Config(format!(
                "rate_limiting.path_prefix must start with '/': {}",
                self.rate_limiting.path_prefix
            )));
        }

        if !self.accounts.enabled && !self.accounts.seed.is_empty() {
            return Err(ConvertFlowError::Config(
                "accounts.seed is set but accounts.enabled is false".to_string(),
            ));
        }

        Ok(())
    }
}
