//! Admission middleware in front of the API routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use super::state::AppState;
use crate::ratelimit::client_identifier;

/// Rate limit every request under the API prefix before it reaches a handler.
pub async fn admission(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_gated(request.uri().path(), &state.api_prefix) {
        return next.run(request).await;
    }

    let client = client_identifier(request.headers());
    let decision = state.rate_limiter.check(&client);

    if let Err(denied) = decision.into_result() {
        warn!(
            client = %client,
            path = %request.uri().path(),
            "Rejecting request over rate limit"
        );
        return denied.into_response();
    }

    next.run(request).await
}

fn is_gated(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
