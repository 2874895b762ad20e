//! Latency endpoints

use axum::Json;
use axum::extract::{Path, State};

use super::MeterApiState;
use crate::api::types::ApiError;
use crate::domain::meter::AppLatencyResponse;

/// GET /v1/latency/portal_apps/{id}
pub async fn app_latency(
    State(state): State<MeterApiState>,
    Path(app_id): Path<String>,
) -> Result<Json<AppLatencyResponse>, ApiError> {
    Ok(Json(state.meter.app_latency(&app_id)?))
}

/// GET /v1/latency/portal_apps
pub async fn all_apps_latencies(
    State(state): State<MeterApiState>,
) -> Result<Json<Vec<AppLatencyResponse>>, ApiError> {
    Ok(Json(state.meter.all_apps_latencies()))
}
