//! Conversion API handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::state::{Accounts, AppState};
use crate::accounts::{generate_api_key, Account, AccountStore};
use crate::convert::{convert, ConversionRequest, Format};
use crate::error::{ConvertFlowError, Result};

const BEARER_PREFIX: &str = "Bearer ";

/// Body of `POST /api/v1/convert`.
#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub to: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub format: Format,
    pub result: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedKey {
    pub api_key: String,
}

/// Convert between JSON and CSV.
#[instrument(skip_all, fields(target_format))]
pub async fn convert_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ConvertResponse>> {
    let api_key = bearer_token(&headers)?;
    let account = resolve_account(&state, api_key).await?;

    let body: ConvertBody = serde_json::from_slice(&body)
        .map_err(|e| ConvertFlowError::invalid(format!("Invalid request body: {}", e)))?;

    let data = body
        .data
        .filter(|data| !is_blank(data))
        .ok_or_else(|| ConvertFlowError::invalid("Missing 'data' field. Provide the data to convert."))?;

    let target: Format = body
        .to
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .parse()?;
    tracing::Span::current().record("target_format", target.as_str());

    let request = ConversionRequest::new(data, target);
    let input_len = request.input_text()?.len();

    if let Some((account, _)) = &account {
        let limits = state.plans.limits(account.plan);
        limits.check_payload(input_len)?;
        // Early rejection on the snapshot; the reservation below is authoritative.
        limits.check_quota(&account.usage, state.clock.now())?;
    }

    let result = convert(&request)?;

    if let Some((account, store)) = &account {
        let now = state.clock.now();
        let quota = store
            .reserve_conversion(account.id, state.plans.limits(account.plan), now)
            .await?;
        debug!(account_id = %account.id, quota = ?quota, "Conversion counted against quota");

        store
            .record_conversion(account.id, request.direction(), input_len, now)
            .await?;
    }

    info!(input_len = input_len, output_len = result.output.len(), "Conversion completed");

    Ok(Json(ConvertResponse {
        success: true,
        format: result.format,
        result: result.to_wire_value()?,
    }))
}

/// Describe the conversion endpoint.
pub async fn describe_handler() -> impl IntoResponse {
    Json(json!({
        "service": "ConvertFlow API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/v1/convert": {
                "description": "Convert between JSON and CSV",
                "body": {
                    "data": "string | array: the data to convert",
                    "to": "'csv' | 'json': target format",
                },
                "headers": {
                    "Authorization": "Bearer YOUR_API_KEY",
                },
            },
        },
    }))
}

/// Issue a new API key.
pub async fn generate_key_handler() -> Json<GeneratedKey> {
    Json(GeneratedKey {
        api_key: generate_api_key(),
    })
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let key = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or_else(|| {
            ConvertFlowError::Unauthorized(
                "Missing or invalid Authorization header. Use: Bearer YOUR_API_KEY".to_string(),
            )
        })?
        .trim();

    if key.is_empty() {
        return Err(ConvertFlowError::Unauthorized("Invalid API key".to_string()));
    }
    Ok(key)
}

/// Look the key up when an account store is configured and make sure its
/// plan may use the API.
async fn resolve_account(
    state: &AppState,
    api_key: &str,
) -> Result<Option<(Account, Arc<dyn AccountStore>)>> {
    let store = match &state.accounts {
        Accounts::Unconfigured => return Ok(None),
        Accounts::Configured(store) => Arc::clone(store),
    };

    let account = store
        .find_by_api_key(api_key)
        .await?
        .ok_or_else(|| ConvertFlowError::Unauthorized("Invalid API key".to_string()))?;

    state.plans.limits(account.plan).check_api_access()?;

    Ok(Some((account, store)))
}

/// Values a client would consider "no data": null, false, 0 and "".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
