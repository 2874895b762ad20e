//! Relay bucket queries (ClickHouse backend)
//!
//! The upstream telemetry pipeline maintains four bucket tables:
//! `relay_counts_daily` (completed days), `relay_counts_today` and
//! `origin_counts_today` (current-day partials, truncated by the upstream at
//! day rollover) and `app_latencies_today` (hourly averages). Timestamps
//! travel as epoch seconds; day math happens on the Rust side.

use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::Deserialize;

use crate::data::telemetry::TelemetryError;
use crate::data::types::{
    DailyCountMap, LatencyMap, LatencySample, OriginCountMap, RelayCount, TodayCountMap,
};
use crate::utils::time::secs_to_datetime;

/// ClickHouse row for daily bucket sums
#[derive(Row, Deserialize)]
struct ChDailyRow {
    app_key: String,
    day_ts: u32,
    success: u64,
    error: u64,
}

/// ClickHouse row for per-app sums
#[derive(Row, Deserialize)]
struct ChAppCountRow {
    app_key: String,
    success: u64,
    error: u64,
}

/// ClickHouse row for per-origin sums
#[derive(Row, Deserialize)]
struct ChOriginCountRow {
    origin: String,
    success: u64,
    error: u64,
}

/// ClickHouse row for hourly latency averages
#[derive(Row, Deserialize)]
struct ChLatencyRow {
    app_key: String,
    hour_ts: u32,
    latency_ms: f64,
}

/// Completed-day buckets, half-open `[from, to)`.
pub async fn daily_counts(
    client: &Client,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<DailyCountMap, TelemetryError> {
    let rows: Vec<ChDailyRow> = client
        .query(
            "SELECT app_key, toUnixTimestamp(day) AS day_ts,
                    sum(success) AS success, sum(error) AS error
             FROM relay_counts_daily
             WHERE day >= fromUnixTimestamp(?) AND day < fromUnixTimestamp(?)
             GROUP BY app_key, day_ts",
        )
        .bind(from.timestamp())
        .bind(to.timestamp())
        .fetch_all()
        .await?;

    let mut counts = DailyCountMap::new();
    for row in rows {
        let day = secs_to_datetime(row.day_ts as i64);
        *counts.entry(day).or_default().entry(row.app_key).or_default() += RelayCount {
            success: row.success,
            failure: row.error,
        };
    }
    Ok(counts)
}

/// Current-day partial sums per app.
pub async fn todays_counts(
    client: &Client,
    today: DateTime<Utc>,
) -> Result<TodayCountMap, TelemetryError> {
    let rows: Vec<ChAppCountRow> = client
        .query(
            "SELECT app_key, sum(success) AS success, sum(error) AS error
             FROM relay_counts_today
             WHERE ts >= fromUnixTimestamp(?)
             GROUP BY app_key",
        )
        .bind(today.timestamp())
        .fetch_all()
        .await?;

    let mut counts = TodayCountMap::new();
    for row in rows {
        *counts.entry(row.app_key).or_default() += RelayCount {
            success: row.success,
            failure: row.error,
        };
    }
    Ok(counts)
}

/// Current-day partial sums per request origin.
pub async fn todays_counts_per_origin(
    client: &Client,
    today: DateTime<Utc>,
) -> Result<OriginCountMap, TelemetryError> {
    let rows: Vec<ChOriginCountRow> = client
        .query(
            "SELECT origin, sum(success) AS success, sum(error) AS error
             FROM origin_counts_today
             WHERE ts >= fromUnixTimestamp(?)
             GROUP BY origin",
        )
        .bind(today.timestamp())
        .fetch_all()
        .await?;

    let mut counts = OriginCountMap::new();
    for row in rows {
        *counts.entry(row.origin).or_default() += RelayCount {
            success: row.success,
            failure: row.error,
        };
    }
    Ok(counts)
}

/// Current-day hourly latency averages, up to 24 samples per app.
pub async fn todays_latency(
    client: &Client,
    today: DateTime<Utc>,
) -> Result<LatencyMap, TelemetryError> {
    let rows: Vec<ChLatencyRow> = client
        .query(
            "SELECT app_key, toUnixTimestamp(hour) AS hour_ts, latency_ms
             FROM app_latencies_today
             WHERE hour >= fromUnixTimestamp(?)",
        )
        .bind(today.timestamp())
        .fetch_all()
        .await?;

    let mut latencies = LatencyMap::new();
    for row in rows {
        latencies.entry(row.app_key).or_default().push(LatencySample {
            time: secs_to_datetime(row.hour_ts as i64),
            latency_ms: row.latency_ms,
        });
    }
    Ok(latencies)
}
