//! HTTP surface: routes, admission middleware and error responses.

mod admission;
mod response;
mod server;
mod service;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};

pub use admission::admission;
pub use server::HttpServer;
pub use service::{
    convert_handler, describe_handler, generate_key_handler, health_handler, ConvertBody,
    ConvertResponse, GeneratedKey,
};
pub use state::{Accounts, AppState};

/// Room for JSON framing around the largest plan payload.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.plans.largest_payload_bytes() + BODY_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/convert", get(describe_handler).post(convert_handler))
        .route("/api/v1/generate-key", post(generate_key_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), admission))
        .with_state(state)
}
