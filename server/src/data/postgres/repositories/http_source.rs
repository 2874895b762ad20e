//! Queries over the HTTP-ingested counter table
//!
//! Edge nodes post per-app counters that land in `http_source_relay_counts`
//! via the ingest path; this repository reads them back as one of the
//! collector's upstream sources.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::{DailyCountMap, RelayCount, TodayCountMap};

/// Ingested counters bucketed per day, half-open `[from, to)`.
pub async fn daily_counts(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<DailyCountMap, PostgresError> {
    let rows = sqlx::query_as::<_, (String, DateTime<Utc>, i64, i64)>(
        "SELECT app_key, day, success, error FROM http_source_relay_counts
         WHERE day >= $1 AND day < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let mut counts = DailyCountMap::new();
    for (app_key, day, success, error) in rows {
        *counts.entry(day).or_default().entry(app_key).or_default() += RelayCount {
            success: success.max(0) as u64,
            failure: error.max(0) as u64,
        };
    }
    Ok(counts)
}

/// Ingested counters for one day bucket (used with the current day).
pub async fn counts_for_day(
    pool: &PgPool,
    day: DateTime<Utc>,
) -> Result<TodayCountMap, PostgresError> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT app_key, success, error FROM http_source_relay_counts WHERE day = $1",
    )
    .bind(day)
    .fetch_all(pool)
    .await?;

    let mut counts = TodayCountMap::new();
    for (app_key, success, error) in rows {
        *counts.entry(app_key).or_default() += RelayCount {
            success: success.max(0) as u64,
            failure: error.max(0) as u64,
        };
    }
    Ok(counts)
}
