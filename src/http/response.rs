//! Mapping of crate errors onto HTTP responses.

use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::ConvertFlowError;
use crate::ratelimit::epoch_secs_ceil;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

impl ConvertFlowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertFlowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ConvertFlowError::RateLimited { .. } | ConvertFlowError::QuotaExceeded { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            ConvertFlowError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ConvertFlowError::Forbidden(_) => StatusCode::FORBIDDEN,
            ConvertFlowError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ConvertFlowError::Store(_) | ConvertFlowError::Config(_) | ConvertFlowError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ConvertFlowError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let ConvertFlowError::RateLimited {
            limit,
            reset_at,
            retry_after_secs,
        } = &self
        {
            let headers = [
                (RATE_LIMIT_LIMIT, limit.to_string()),
                (RATE_LIMIT_REMAINING, "0".to_string()),
                (RATE_LIMIT_RESET, epoch_secs_ceil(*reset_at).to_string()),
                (header::RETRY_AFTER, retry_after_secs.to_string()),
            ];
            let body = Json(json!({
                "error": "Too many requests",
                "message": self.to_string(),
            }));
            return (status, headers, body).into_response();
        }

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
