//! API key authentication
//!
//! Every `/v1` route requires an `Authorization` header whose raw value is
//! in the configured allowlist. Keys are deployment-issued opaque strings;
//! there is no per-key scoping.

use std::collections::HashSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Clone)]
pub struct AuthState {
    pub api_keys: Arc<HashSet<String>>,
}

/// Whether the request carries an allowlisted `Authorization` value.
pub fn is_authorized(headers: &HeaderMap, api_keys: &HashSet<String>) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|key| api_keys.contains(key))
}

/// Middleware guarding the `/v1` routes.
pub async fn require_api_key(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    if is_authorized(request.headers(), &state.api_keys) {
        return next.run(request).await;
    }

    let body = json!({
        "error": "unauthorized",
        "code": "API_KEY_INVALID",
        "message": "Missing or invalid API key",
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
