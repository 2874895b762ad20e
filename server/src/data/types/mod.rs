//! Domain types shared across the data pipeline
//!
//! These are the value types carried from the sources through the collector
//! into the durable store and out of the meter cache. Map keys for days are
//! always 00:00 UTC of the calendar day.

use std::collections::HashMap;
use std::ops::{Add, AddAssign};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relay totals for one application (or origin) bucket.
///
/// Addition is componentwise; absent apps imply zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCount {
    pub success: u64,
    pub failure: u64,
}

impl Add for RelayCount {
    type Output = RelayCount;

    fn add(self, rhs: RelayCount) -> RelayCount {
        RelayCount {
            success: self.success + rhs.success,
            failure: self.failure + rhs.failure,
        }
    }
}

impl AddAssign for RelayCount {
    fn add_assign(&mut self, rhs: RelayCount) {
        self.success += rhs.success;
        self.failure += rhs.failure;
    }
}

/// One hourly latency average for an application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySample {
    pub time: DateTime<Utc>,
    pub latency_ms: f64,
}

/// `day (00:00 UTC) -> app key -> counts` for completed calendar days.
pub type DailyCountMap = HashMap<DateTime<Utc>, HashMap<String, RelayCount>>;

/// `app key -> counts` snapshot of the current calendar day at pull time.
pub type TodayCountMap = HashMap<String, RelayCount>;

/// `origin -> counts` snapshot of the current calendar day.
pub type OriginCountMap = HashMap<String, RelayCount>;

/// `app key -> hourly latency samples` (up to 24 per app).
pub type LatencyMap = HashMap<String, Vec<LatencySample>>;

/// One edge-posted relay counter destined for the ingest table.
///
/// `day` is truncated to midnight before it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRecord {
    pub portal_app_id: String,
    pub day: DateTime<Utc>,
    pub success: u64,
    pub error: u64,
}
