//! HTTP-ingest relay source
//!
//! Adapts the `http_source_relay_counts` table into the source contract so
//! edge-posted counters are merged with telemetry data on every collection
//! cycle. This source carries no origin or latency data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::PostgresService;
use super::repositories::http_source as queries;
use crate::data::error::DataError;
use crate::data::traits::RelaySource;
use crate::data::types::{DailyCountMap, LatencyMap, OriginCountMap, TodayCountMap};
use crate::utils::time::start_of_day;

pub struct HttpRelaySource {
    pool: PgPool,
}

impl HttpRelaySource {
    pub fn new(service: &PostgresService) -> Self {
        Self {
            pool: service.pool().clone(),
        }
    }
}

#[async_trait]
impl RelaySource for HttpRelaySource {
    fn name(&self) -> &'static str {
        "http-ingest"
    }

    async fn daily_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DailyCountMap, DataError> {
        Ok(queries::daily_counts(&self.pool, from, to).await?)
    }

    async fn todays_counts(&self) -> Result<TodayCountMap, DataError> {
        let today = start_of_day(Utc::now());
        Ok(queries::counts_for_day(&self.pool, today).await?)
    }

    async fn todays_counts_per_origin(&self) -> Result<OriginCountMap, DataError> {
        Ok(OriginCountMap::new())
    }

    async fn todays_latency(&self) -> Result<LatencyMap, DataError> {
        Ok(LatencyMap::new())
    }
}
