//! Relay aggregation and ingest endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::MeterApiState;
use crate::api::types::{ApiError, parse_timestamp_param};
use crate::data::types::IngestRecord;
use crate::domain::meter::{
    OriginClassificationResponse, PortalAppRelaysResponse, TotalRelaysResponse,
    UserRelaysResponse,
};

#[derive(Debug, Deserialize)]
pub struct TimespanQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

fn parse_range(
    query: &TimespanQuery,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
    Ok((
        parse_timestamp_param(&query.from)?,
        parse_timestamp_param(&query.to)?,
    ))
}

/// GET /v1/relays
pub async fn total_relays(
    State(state): State<MeterApiState>,
    Query(query): Query<TimespanQuery>,
) -> Result<Json<TotalRelaysResponse>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.meter.total_relays(from, to)?))
}

/// GET /v1/relays/portal_apps
pub async fn all_portal_apps_relays(
    State(state): State<MeterApiState>,
    Query(query): Query<TimespanQuery>,
) -> Result<Json<Vec<PortalAppRelaysResponse>>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.meter.all_portal_apps_relays(from, to).await?))
}

/// GET /v1/relays/portal_apps/{id}
pub async fn portal_app_relays(
    State(state): State<MeterApiState>,
    Path(app_id): Path<String>,
    Query(query): Query<TimespanQuery>,
) -> Result<Json<PortalAppRelaysResponse>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.meter.portal_app_relays(&app_id, from, to).await?))
}

/// GET /v1/relays/users/{id}
pub async fn user_relays(
    State(state): State<MeterApiState>,
    Path(user_id): Path<String>,
    Query(query): Query<TimespanQuery>,
) -> Result<Json<UserRelaysResponse>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.meter.user_relays(&user_id, from, to).await?))
}

/// GET /v1/relays/origin-classification
pub async fn all_relays_origin(
    State(state): State<MeterApiState>,
    Query(query): Query<TimespanQuery>,
) -> Result<Json<Vec<OriginClassificationResponse>>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.meter.all_relays_origin(from, to)?))
}

/// GET /v1/relays/origin-classification/{origin}
pub async fn relays_origin(
    State(state): State<MeterApiState>,
    Path(origin): Path<String>,
    Query(query): Query<TimespanQuery>,
) -> Result<Json<OriginClassificationResponse>, ApiError> {
    let (from, to) = parse_range(&query)?;
    Ok(Json(state.meter.relays_origin(&origin, from, to)?))
}

/// One posted counter; the day is assigned server-side as the current day.
#[derive(Debug, Deserialize)]
pub struct IngestCountRequest {
    #[serde(rename = "portalAppID")]
    pub portal_app_id: String,
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub error: u64,
}

/// POST /v1/relays/counts
pub async fn ingest_relay_counts(
    State(state): State<MeterApiState>,
    Json(body): Json<Vec<IngestCountRequest>>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let now = Utc::now();
    let records: Vec<IngestRecord> = body
        .into_iter()
        .map(|request| IngestRecord {
            portal_app_id: request.portal_app_id,
            day: now,
            success: request.success,
            error: request.error,
        })
        .collect();

    state.ingest.write_ingest_counts(records).await?;
    Ok((StatusCode::OK, "counters added"))
}
