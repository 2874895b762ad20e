//! Source contract implementation for the telemetry service

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::TelemetryService;
use super::repositories::relays;
use crate::data::error::DataError;
use crate::data::traits::RelaySource;
use crate::data::types::{DailyCountMap, LatencyMap, OriginCountMap, TodayCountMap};
use crate::utils::time::start_of_day;

#[async_trait]
impl RelaySource for TelemetryService {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn daily_counts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<DailyCountMap, DataError> {
        Ok(relays::daily_counts(self.client(), from, to).await?)
    }

    async fn todays_counts(&self) -> Result<TodayCountMap, DataError> {
        let today = start_of_day(Utc::now());
        Ok(relays::todays_counts(self.client(), today).await?)
    }

    async fn todays_counts_per_origin(&self) -> Result<OriginCountMap, DataError> {
        let today = start_of_day(Utc::now());
        Ok(relays::todays_counts_per_origin(self.client(), today).await?)
    }

    async fn todays_latency(&self) -> Result<LatencyMap, DataError> {
        let today = start_of_day(Utc::now());
        Ok(relays::todays_latency(self.client(), today).await?)
    }
}
