//! Time-period normalization
//!
//! Every date range accepted from the outside (HTTP query parameters,
//! collector backfill bounds, meter load windows) passes through
//! [`normalize_timespan`] before any comparison against stored days.
//! Consumers supply inclusive date ranges; internals work on half-open
//! `[from, to)` ranges aligned to UTC day boundaries.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use thiserror::Error;

/// Range whose start lies after its end.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timespan: from {from} is after to {to}")]
pub struct InvalidTimespan {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Convert seconds since Unix epoch to DateTime<Utc>
pub fn secs_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(|| {
        tracing::warn!(secs, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// 00:00:00 UTC of the instant's calendar day.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// 00:00:00 UTC of the calendar day after the instant's day.
pub fn start_of_next_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) + Duration::days(1)
}

/// Canonicalize an inclusive `(from, to)` pair to day boundaries.
///
/// A missing `from` defaults to `now - max_past`; a missing `to` defaults to
/// now. After substitution `from > to` is rejected (`from == to` expands to a
/// one-day range). The returned `from` is the start of its day and the
/// returned `to` is the start of the day after the requested end, so every
/// downstream comparison can be written `day >= from && day < to`.
pub fn normalize_timespan(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    max_past: Duration,
) -> Result<(DateTime<Utc>, DateTime<Utc>), InvalidTimespan> {
    let now = Utc::now();
    let from = from.unwrap_or(now - max_past);
    let to = to.unwrap_or(now);

    if from > to {
        return Err(InvalidTimespan { from, to });
    }

    Ok((start_of_day(from), start_of_next_day(to)))
}
