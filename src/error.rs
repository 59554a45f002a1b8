//! Error types for the ConvertFlow service.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for ConvertFlow operations.
#[derive(Error, Debug)]
pub enum ConvertFlowError {
    /// Malformed conversion input or request body
    #[error("{0}")]
    InvalidInput(String),

    /// Client exceeded its admission window
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited {
        /// Maximum requests per window
        limit: u64,
        /// When the current window ends
        reset_at: DateTime<Utc>,
        /// Whole seconds until the window ends
        retry_after_secs: u64,
    },

    /// Missing or unknown credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Credentials are valid but the plan does not allow the operation
    #[error("{0}")]
    Forbidden(String),

    /// Payload exceeds the plan's size limit
    #[error("Payload of {size} bytes exceeds the {limit} byte limit of your plan")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Daily conversion quota spent
    #[error("Daily conversion limit of {limit} reached. Upgrade to Pro for unlimited conversions.")]
    QuotaExceeded { limit: u32 },

    /// Account store failures
    #[error("Account store error: {0}")]
    Store(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertFlowError {
    /// Shorthand for building an [`ConvertFlowError::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        ConvertFlowError::InvalidInput(message.into())
    }
}

/// Result type alias for ConvertFlow operations.
pub type Result<T> = std::result::Result<T, ConvertFlowError>;
