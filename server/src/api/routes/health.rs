//! Health check endpoint

use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Liveness probe; plain text so edge health checks stay trivial.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        concat!("relay-meter v", env!("CARGO_PKG_VERSION")),
    )
}
