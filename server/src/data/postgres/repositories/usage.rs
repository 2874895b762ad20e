//! Usage repository for the canonical daily and today tables
//!
//! The daily table is append-only: the collector writes each completed day
//! exactly once (gap-fill contract), and rows are never mutated. The three
//! `todays_*` tables are rewritten wholesale inside one transaction per
//! refresh so readers never observe a partial today snapshot.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::postgres::PostgresError;
use crate::data::types::{
    DailyCountMap, IngestRecord, LatencyMap, LatencySample, OriginCountMap, RelayCount,
    TodayCountMap,
};

/// Daily rows with `day` in the inclusive `[from, to]` range.
///
/// Duplicate `(app_key, day)` rows (manual backfill overlap) are summed.
pub async fn daily_usage(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<DailyCountMap, PostgresError> {
    let rows = sqlx::query_as::<_, (String, i64, i64, DateTime<Utc>)>(
        "SELECT app_key, success, failure, day FROM daily_app_sums WHERE day >= $1 AND day <= $2",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let mut usage = DailyCountMap::new();
    for (app_key, success, failure, day) in rows {
        let count = usage.entry(day).or_default().entry(app_key).or_default();
        *count += RelayCount {
            success: success.max(0) as u64,
            failure: failure.max(0) as u64,
        };
    }
    Ok(usage)
}

/// Snapshot of the current day's per-app sums.
pub async fn todays_usage(pool: &PgPool) -> Result<TodayCountMap, PostgresError> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT app_key, success, failure FROM todays_app_sums",
    )
    .fetch_all(pool)
    .await?;

    let mut usage = TodayCountMap::new();
    for (app_key, success, failure) in rows {
        *usage.entry(app_key).or_default() += RelayCount {
            success: success.max(0) as u64,
            failure: failure.max(0) as u64,
        };
    }
    Ok(usage)
}

/// Today's hourly latency averages, in stored order.
pub async fn todays_latency(pool: &PgPool) -> Result<LatencyMap, PostgresError> {
    let rows = sqlx::query_as::<_, (String, DateTime<Utc>, f64)>(
        "SELECT app_key, time, latency FROM todays_app_latencies",
    )
    .fetch_all(pool)
    .await?;

    let mut latencies = LatencyMap::new();
    for (app_key, time, latency_ms) in rows {
        latencies
            .entry(app_key)
            .or_default()
            .push(LatencySample { time, latency_ms });
    }
    Ok(latencies)
}

/// Snapshot of the current day's per-origin sums.
pub async fn todays_origin_usage(pool: &PgPool) -> Result<OriginCountMap, PostgresError> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT origin, success, failure FROM todays_relay_counts",
    )
    .fetch_all(pool)
    .await?;

    let mut usage = OriginCountMap::new();
    for (origin, success, failure) in rows {
        *usage.entry(origin).or_default() += RelayCount {
            success: success.max(0) as u64,
            failure: failure.max(0) as u64,
        };
    }
    Ok(usage)
}

/// Persisted `(first, last)` day pair, `None` when the daily store is empty.
pub async fn existing_metrics_timespan(
    pool: &PgPool,
) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, PostgresError> {
    let (first, last) = sqlx::query_as::<_, (Option<DateTime<Utc>>, Option<DateTime<Utc>>)>(
        "SELECT MIN(day), MAX(day) FROM daily_app_sums",
    )
    .fetch_one(pool)
    .await?;

    Ok(match (first, last) {
        (Some(first), Some(last)) => Some((first, last)),
        _ => None,
    })
}

/// Insert daily rows for days the caller knows are not yet persisted.
///
/// Origin usage is today-only in this system; the `origins` argument exists
/// to mirror the write contract and is not persisted historically.
pub async fn write_daily_usage(
    pool: &PgPool,
    counts: &DailyCountMap,
    _origins: &OriginCountMap,
) -> Result<(), PostgresError> {
    let mut tx = pool.begin().await?;

    for (day, apps) in counts {
        for (app_key, count) in apps {
            sqlx::query(
                "INSERT INTO daily_app_sums (app_key, success, failure, day) VALUES ($1, $2, $3, $4)",
            )
            .bind(app_key)
            .bind(count.success as i64)
            .bind(count.failure as i64)
            .bind(day)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Destructive today refresh: clear all three today tables, then insert.
///
/// Runs in one transaction so a reader sees either the previous snapshot or
/// the new one, never a mix.
pub async fn write_todays_metrics(
    pool: &PgPool,
    counts: &TodayCountMap,
    origins: &OriginCountMap,
    latencies: &LatencyMap,
) -> Result<(), PostgresError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM todays_app_sums")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM todays_relay_counts")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM todays_app_latencies")
        .execute(&mut *tx)
        .await?;

    for (app_key, count) in counts {
        sqlx::query("INSERT INTO todays_app_sums (app_key, success, failure) VALUES ($1, $2, $3)")
            .bind(app_key)
            .bind(count.success as i64)
            .bind(count.failure as i64)
            .execute(&mut *tx)
            .await?;
    }

    for (origin, count) in origins {
        sqlx::query(
            "INSERT INTO todays_relay_counts (origin, success, failure) VALUES ($1, $2, $3)",
        )
        .bind(origin)
        .bind(count.success as i64)
        .bind(count.failure as i64)
        .execute(&mut *tx)
        .await?;
    }

    for (app_key, samples) in latencies {
        for sample in samples {
            sqlx::query(
                "INSERT INTO todays_app_latencies (app_key, time, latency) VALUES ($1, $2, $3)",
            )
            .bind(app_key)
            .bind(sample.time)
            .bind(sample.latency_ms)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Upsert edge-posted counters, accumulating into existing `(app_key, day)`
/// rows.
pub async fn write_ingest_counts(
    pool: &PgPool,
    records: &[IngestRecord],
) -> Result<(), PostgresError> {
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO http_source_relay_counts (app_key, day, success, error)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (app_key, day) DO UPDATE
             SET success = http_source_relay_counts.success + EXCLUDED.success,
                 error = http_source_relay_counts.error + EXCLUDED.error",
        )
        .bind(&record.portal_app_id)
        .bind(record.day)
        .bind(record.success as i64)
        .bind(record.error as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
