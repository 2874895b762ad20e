//! Store contract implementations for the PostgreSQL service
//!
//! Thin delegation to the free functions in `repositories::usage`; the
//! traits are what the meter and collector program against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PostgresService;
use super::repositories::usage;
use crate::data::error::DataError;
use crate::data::traits::{UsageReporter, UsageWriter};
use crate::data::types::{
    DailyCountMap, IngestRecord, LatencyMap, OriginCountMap, TodayCountMap,
};

#[async_trait]
impl UsageReporter for PostgresService {
    async fn daily_usage(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DailyCountMap, DataError> {
        Ok(usage::daily_usage(self.pool(), from, to).await?)
    }

    async fn todays_usage(&self) -> Result<TodayCountMap, DataError> {
        Ok(usage::todays_usage(self.pool()).await?)
    }

    async fn todays_latency(&self) -> Result<LatencyMap, DataError> {
        Ok(usage::todays_latency(self.pool()).await?)
    }

    async fn todays_origin_usage(&self) -> Result<OriginCountMap, DataError> {
        Ok(usage::todays_origin_usage(self.pool()).await?)
    }
}

#[async_trait]
impl UsageWriter for PostgresService {
    async fn existing_metrics_timespan(
        &self,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, DataError> {
        Ok(usage::existing_metrics_timespan(self.pool()).await?)
    }

    async fn write_daily_usage(
        &self,
        counts: &DailyCountMap,
        origins: &OriginCountMap,
    ) -> Result<(), DataError> {
        Ok(usage::write_daily_usage(self.pool(), counts, origins).await?)
    }

    async fn write_todays_metrics(
        &self,
        counts: &TodayCountMap,
        origins: &OriginCountMap,
        latencies: &LatencyMap,
    ) -> Result<(), DataError> {
        Ok(usage::write_todays_metrics(self.pool(), counts, origins, latencies).await?)
    }

    async fn write_ingest_counts(&self, records: &[IngestRecord]) -> Result<(), DataError> {
        Ok(usage::write_ingest_counts(self.pool(), records).await?)
    }
}
