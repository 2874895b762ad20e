//! Contracts between the pipeline and its backing stores
//!
//! The collector and the meter never touch a concrete driver directly; they
//! speak these traits. Postgres implements the reporter and writer roles,
//! ClickHouse and the HTTP-ingest table implement the source role, and the
//! portal identity service implements the app directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::error::DataError;
use crate::data::types::{
    DailyCountMap, IngestRecord, LatencyMap, OriginCountMap, TodayCountMap,
};

/// Read side of the durable store, used by the meter's loader.
///
/// `daily_usage` returns rows with `day` in the inclusive `[from, to]` range;
/// the caller passes normalized bounds and applies its own half-open
/// filtering on emission.
#[async_trait]
pub trait UsageReporter: Send + Sync {
    async fn daily_usage(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DailyCountMap, DataError>;

    async fn todays_usage(&self) -> Result<TodayCountMap, DataError>;

    /// Samples are returned in stored order; consumers re-sort on emission.
    async fn todays_latency(&self) -> Result<LatencyMap, DataError>;

    async fn todays_origin_usage(&self) -> Result<OriginCountMap, DataError>;
}

/// Write side of the durable store, used by the collector and ingest.
#[async_trait]
pub trait UsageWriter: Send + Sync {
    /// Persisted `(first, last)` day pair, `None` when the daily store is
    /// empty. The range is guaranteed gap-free by the collector.
    async fn existing_metrics_timespan(
        &self,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, DataError>;

    /// Insert daily rows. The caller guarantees none of those days are
    /// already persisted; overlapping writes duplicate rows.
    async fn write_daily_usage(
        &self,
        counts: &DailyCountMap,
        origins: &OriginCountMap,
    ) -> Result<(), DataError>;

    /// Destructive today refresh: clears the today, today-origin and
    /// today-latency tables, then inserts, all in one transaction.
    async fn write_todays_metrics(
        &self,
        counts: &TodayCountMap,
        origins: &OriginCountMap,
        latencies: &LatencyMap,
    ) -> Result<(), DataError>;

    /// Upsert edge-posted counters for the current day.
    async fn write_ingest_counts(&self, records: &[IngestRecord]) -> Result<(), DataError>;
}

/// One upstream producer of relay counts for a refresh cycle.
///
/// `daily_counts` receives normalized half-open bounds: buckets with
/// `day >= from && day < to` are returned. Daily and per-origin data are
/// authoritative for billing; today's counts and latency are best-effort.
#[async_trait]
pub trait RelaySource: Send + Sync {
    /// Stable identifier used in diagnostics and logs.
    fn name(&self) -> &'static str;

    async fn daily_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DailyCountMap, DataError>;

    async fn todays_counts(&self) -> Result<TodayCountMap, DataError>;

    async fn todays_counts_per_origin(&self) -> Result<OriginCountMap, DataError>;

    async fn todays_latency(&self) -> Result<LatencyMap, DataError>;
}

/// Lookup of registered portal applications in the identity service.
#[async_trait]
pub trait AppDirectory: Send + Sync {
    async fn portal_app_exists(&self, app_id: &str) -> Result<bool, DataError>;

    async fn portal_app_ids(&self) -> Result<Vec<String>, DataError>;

    async fn user_portal_app_ids(&self, user_id: &str) -> Result<Vec<String>, DataError>;
}
