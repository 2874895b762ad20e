//! Relay usage meter
//!
//! In-memory snapshot of the durable store: historical daily counts on one
//! side, today's partial counts, per-origin counts and latency on the
//! other. A background loader refreshes the two halves under independent
//! TTLs; query operations aggregate over the cached maps only, so request
//! handlers never touch the store.
//!
//! Today's data is hotter and cheaper to recompute than the historical
//! half, which is stable within a day; splitting the TTLs lets today
//! refresh more often without re-reading a month of daily rows.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::constants::{
    METER_DEFAULT_DAILY_TTL_SECS, METER_DEFAULT_MAX_PAST_DAYS, METER_DEFAULT_TODAYS_TTL_SECS,
};
use crate::data::error::DataError;
use crate::data::traits::{AppDirectory, UsageReporter};
use crate::data::types::{
    DailyCountMap, LatencyMap, LatencySample, OriginCountMap, RelayCount, TodayCountMap,
};
use crate::utils::time::{InvalidTimespan, normalize_timespan, start_of_day};

#[derive(Error, Debug)]
pub enum MeterError {
    #[error(transparent)]
    InvalidTimespan(#[from] InvalidTimespan),

    #[error("portal app {0} not found")]
    PortalAppNotFound(String),

    #[error("no latency data for portal app {0}")]
    AppLatencyNotFound(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Meter tuning; zero values fall back to the built-in defaults.
#[derive(Debug, Clone, Copy)]
pub struct MeterConfig {
    pub load_interval: std::time::Duration,
    pub daily_ttl: std::time::Duration,
    pub todays_ttl: std::time::Duration,
    pub max_past_days: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TotalRelaysResponse {
    pub count: RelayCount,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortalAppRelaysResponse {
    #[serde(rename = "portalAppID")]
    pub portal_app_id: String,
    pub count: RelayCount,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRelaysResponse {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "portalAppIDs")]
    pub portal_app_ids: Vec<String>,
    pub count: RelayCount,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OriginClassificationResponse {
    pub origin: String,
    pub count: RelayCount,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppLatencyResponse {
    #[serde(rename = "portalAppID")]
    pub portal_app_id: String,
    pub daily_latency: Vec<LatencySample>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// The cached snapshot; swapped wholesale per half, never patched in place.
struct CachedUsage {
    daily_usage: DailyCountMap,
    todays_usage: TodayCountMap,
    todays_origin_usage: OriginCountMap,
    todays_latency: LatencyMap,
    daily_expires_at: DateTime<Utc>,
    today_expires_at: DateTime<Utc>,
}

impl Default for CachedUsage {
    fn default() -> Self {
        Self {
            daily_usage: DailyCountMap::new(),
            todays_usage: TodayCountMap::new(),
            todays_origin_usage: OriginCountMap::new(),
            todays_latency: LatencyMap::new(),
            daily_expires_at: DateTime::UNIX_EPOCH,
            today_expires_at: DateTime::UNIX_EPOCH,
        }
    }
}

pub struct Meter {
    reporter: Arc<dyn UsageReporter>,
    apps: Arc<dyn AppDirectory>,
    cache: RwLock<CachedUsage>,
    load_interval: std::time::Duration,
    daily_ttl: Duration,
    todays_ttl: Duration,
    max_past: Duration,
}

impl Meter {
    pub fn new(
        reporter: Arc<dyn UsageReporter>,
        apps: Arc<dyn AppDirectory>,
        config: MeterConfig,
    ) -> Self {
        let daily_ttl_secs = if config.daily_ttl.as_secs() > 0 {
            config.daily_ttl.as_secs()
        } else {
            METER_DEFAULT_DAILY_TTL_SECS
        };
        let todays_ttl_secs = if config.todays_ttl.as_secs() > 0 {
            config.todays_ttl.as_secs()
        } else {
            METER_DEFAULT_TODAYS_TTL_SECS
        };
        let max_past_days = if config.max_past_days > 0 {
            config.max_past_days
        } else {
            METER_DEFAULT_MAX_PAST_DAYS
        };

        Self {
            reporter,
            apps,
            cache: RwLock::new(CachedUsage::default()),
            load_interval: config.load_interval,
            daily_ttl: Duration::seconds(daily_ttl_secs as i64),
            todays_ttl: Duration::seconds(todays_ttl_secs as i64),
            max_past: Duration::days(max_past_days),
        }
    }

    /// Spawn the background loader: one load immediately, then one per
    /// interval until shutdown.
    pub fn start_loader(self: &Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let meter = Arc::clone(self);
        tokio::spawn(async move {
            meter.load().await;

            let mut timer = tokio::time::interval(meter.load_interval);
            timer.tick().await; // Skip immediate first tick

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Meter loader shutting down");
                            break;
                        }
                    }
                    _ = timer.tick() => {
                        meter.load().await;
                    }
                }
            }
        })
    }

    /// Refresh whichever cache halves are missing or past their TTL.
    ///
    /// All store I/O happens with no lock held; the write lock is taken only
    /// for the final snapshot swap. A daily read failure leaves both TTLs
    /// untouched so the next tick retries; a today read failure only loses
    /// the today refresh.
    pub async fn load(&self) {
        let now = Utc::now();
        let (from, to) = match normalize_timespan(Some(now - self.max_past), Some(now), self.max_past)
        {
            Ok(bounds) => bounds,
            Err(e) => {
                tracing::error!(error = %e, "Load window normalization failed");
                return;
            }
        };

        let (no_data, daily_stale, today_stale) = {
            let cache = self.cache.read();
            let no_data = cache.daily_usage.is_empty()
                || cache.todays_usage.is_empty()
                || cache.todays_origin_usage.is_empty()
                || cache.todays_latency.is_empty();
            (
                no_data,
                now > cache.daily_expires_at,
                now > cache.today_expires_at,
            )
        };

        let daily = if no_data || daily_stale {
            match self.reporter.daily_usage(from, to).await {
                Ok(map) => Some(map),
                Err(e) => {
                    tracing::error!(error = %e, "Daily usage load failed");
                    return;
                }
            }
        } else {
            None
        };

        let today = if no_data || today_stale {
            match self.fetch_today().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::error!(error = %e, "Today's usage load failed");
                    None
                }
            }
        } else {
            None
        };

        let mut cache = self.cache.write();
        if let Some(daily_usage) = daily {
            tracing::debug!(days = daily_usage.len(), "Refreshed daily usage");
            cache.daily_usage = daily_usage;
            cache.daily_expires_at = now + self.daily_ttl;
        }
        if let Some((counts, origins, latencies)) = today {
            tracing::debug!(apps = counts.len(), "Refreshed today's usage");
            cache.todays_usage = counts;
            cache.todays_origin_usage = origins;
            cache.todays_latency = latencies;
            cache.today_expires_at = now + self.todays_ttl;
        }
    }

    /// Fetch the three today maps; latency is best-effort.
    async fn fetch_today(
        &self,
    ) -> Result<(TodayCountMap, OriginCountMap, LatencyMap), DataError> {
        let counts = self.reporter.todays_usage().await?;
        let origins = self.reporter.todays_origin_usage().await?;
        let latencies = match self.reporter.todays_latency().await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Today's latency unavailable");
                LatencyMap::new()
            }
        };
        Ok((counts, origins, latencies))
    }

    /// Total relays across all apps in the requested range.
    pub fn total_relays(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<TotalRelaysResponse, MeterError> {
        let (from, to) = normalize_timespan(from, to, self.max_past)?;
        let include_today = start_of_day(Utc::now()) < to;

        let cache = self.cache.read();
        let mut count = RelayCount::default();
        for (day, apps) in &cache.daily_usage {
            if *day >= from && *day < to {
                for app_count in apps.values() {
                    count += *app_count;
                }
            }
        }
        if include_today {
            for app_count in cache.todays_usage.values() {
                count += *app_count;
            }
        }

        Ok(TotalRelaysResponse { count, from, to })
    }

    /// Relays for one registered portal app.
    pub async fn portal_app_relays(
        &self,
        app_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<PortalAppRelaysResponse, MeterError> {
        let (from, to) = normalize_timespan(from, to, self.max_past)?;
        if !self.apps.portal_app_exists(app_id).await? {
            return Err(MeterError::PortalAppNotFound(app_id.to_string()));
        }
        Ok(self.project_app(app_id, from, to))
    }

    /// Relays for every app the portal knows about.
    pub async fn all_portal_apps_relays(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<PortalAppRelaysResponse>, MeterError> {
        let (from, to) = normalize_timespan(from, to, self.max_past)?;
        let app_ids = self.apps.portal_app_ids().await?;
        Ok(app_ids
            .iter()
            .map(|app_id| self.project_app(app_id, from, to))
            .collect())
    }

    /// Relays summed over every app owned by the user.
    pub async fn user_relays(
        &self,
        user_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<UserRelaysResponse, MeterError> {
        let (from, to) = normalize_timespan(from, to, self.max_past)?;
        let app_ids = self.apps.user_portal_app_ids(user_id).await?;
        let include_today = start_of_day(Utc::now()) < to;

        let cache = self.cache.read();
        let mut count = RelayCount::default();
        for (day, apps) in &cache.daily_usage {
            if *day >= from && *day < to {
                for app_id in &app_ids {
                    if let Some(app_count) = apps.get(app_id) {
                        count += *app_count;
                    }
                }
            }
        }
        if include_today {
            for app_id in &app_ids {
                if let Some(app_count) = cache.todays_usage.get(app_id) {
                    count += *app_count;
                }
            }
        }

        Ok(UserRelaysResponse {
            user_id: user_id.to_string(),
            portal_app_ids: app_ids,
            count,
            from,
            to,
        })
    }

    /// Per-origin relay counts; origin data exists for today only, so a
    /// range that excludes today yields an empty list rather than zeros.
    pub fn all_relays_origin(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<OriginClassificationResponse>, MeterError> {
        let (from, to) = normalize_timespan(from, to, self.max_past)?;
        if start_of_day(Utc::now()) >= to {
            return Ok(Vec::new());
        }

        let cache = self.cache.read();
        Ok(cache
            .todays_origin_usage
            .iter()
            .map(|(origin, count)| OriginClassificationResponse {
                origin: origin.clone(),
                count: *count,
                from,
                to,
            })
            .collect())
    }

    /// First origin whose key contains the given fragment; a miss echoes the
    /// fragment with zero counts.
    pub fn relays_origin(
        &self,
        origin: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<OriginClassificationResponse, MeterError> {
        let (from, to) = normalize_timespan(from, to, self.max_past)?;

        if start_of_day(Utc::now()) < to {
            let cache = self.cache.read();
            for (key, count) in &cache.todays_origin_usage {
                if key.contains(origin) {
                    return Ok(OriginClassificationResponse {
                        origin: key.clone(),
                        count: *count,
                        from,
                        to,
                    });
                }
            }
        }

        Ok(OriginClassificationResponse {
            origin: origin.to_string(),
            count: RelayCount::default(),
            from,
            to,
        })
    }

    /// Today's latency samples for one app, sorted ascending by time.
    pub fn app_latency(&self, app_id: &str) -> Result<AppLatencyResponse, MeterError> {
        let samples = {
            let cache = self.cache.read();
            cache.todays_latency.get(app_id).cloned().unwrap_or_default()
        };
        latency_response(app_id, samples)
            .ok_or_else(|| MeterError::AppLatencyNotFound(app_id.to_string()))
    }

    /// Today's latency samples for every app that has any.
    pub fn all_apps_latencies(&self) -> Vec<AppLatencyResponse> {
        let latency_map = {
            let cache = self.cache.read();
            cache.todays_latency.clone()
        };
        latency_map
            .into_iter()
            .filter_map(|(app_id, samples)| latency_response(&app_id, samples))
            .collect()
    }

    /// Project the cached maps onto one app column. Callers hold no lock.
    fn project_app(
        &self,
        app_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortalAppRelaysResponse {
        let include_today = start_of_day(Utc::now()) < to;

        let cache = self.cache.read();
        let mut count = RelayCount::default();
        for (day, apps) in &cache.daily_usage {
            if *day >= from && *day < to
                && let Some(app_count) = apps.get(app_id)
            {
                count += *app_count;
            }
        }
        if include_today
            && let Some(app_count) = cache.todays_usage.get(app_id)
        {
            count += *app_count;
        }

        PortalAppRelaysResponse {
            portal_app_id: app_id.to_string(),
            count,
            from,
            to,
        }
    }
}

/// Sort samples and wrap them; `None` when the app has no samples. The
/// reported range spans the first to the last sample instant, ignoring gaps
/// within the 24-hour window.
fn latency_response(app_id: &str, mut samples: Vec<LatencySample>) -> Option<AppLatencyResponse> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by_key(|sample| sample.time);
    let from = samples.first().map_or(DateTime::UNIX_EPOCH, |s| s.time);
    let to = samples.last().map_or(DateTime::UNIX_EPOCH, |s| s.time);
    Some(AppLatencyResponse {
        portal_app_id: app_id.to_string(),
        daily_latency: samples,
        from,
        to,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn count(success: u64, failure: u64) -> RelayCount {
        RelayCount { success, failure }
    }

    /// Reporter serving fixed maps, with per-query failure switches
    #[derive(Default)]
    struct FakeReporter {
        daily: DailyCountMap,
        today: TodayCountMap,
        origins: OriginCountMap,
        latency: LatencyMap,
        fail_daily: bool,
        fail_today: bool,
        fail_latency: bool,
    }

    fn io_error() -> DataError {
        DataError::Config("store offline".into())
    }

    #[async_trait]
    impl UsageReporter for FakeReporter {
        async fn daily_usage(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<DailyCountMap, DataError> {
            if self.fail_daily {
                return Err(io_error());
            }
            Ok(self.daily.clone())
        }

        async fn todays_usage(&self) -> Result<TodayCountMap, DataError> {
            if self.fail_today {
                return Err(io_error());
            }
            Ok(self.today.clone())
        }

        async fn todays_latency(&self) -> Result<LatencyMap, DataError> {
            if self.fail_latency {
                return Err(io_error());
            }
            Ok(self.latency.clone())
        }

        async fn todays_origin_usage(&self) -> Result<OriginCountMap, DataError> {
            Ok(self.origins.clone())
        }
    }

    /// Directory with a fixed app registry and user ownership
    #[derive(Default)]
    struct FakeDirectory {
        apps: Vec<String>,
        users: HashMap<String, Vec<String>>,
    }

    #[async_trait]
    impl AppDirectory for FakeDirectory {
        async fn portal_app_exists(&self, app_id: &str) -> Result<bool, DataError> {
            Ok(self.apps.iter().any(|app| app == app_id))
        }

        async fn portal_app_ids(&self) -> Result<Vec<String>, DataError> {
            Ok(self.apps.clone())
        }

        async fn user_portal_app_ids(&self, user_id: &str) -> Result<Vec<String>, DataError> {
            Ok(self.users.get(user_id).cloned().unwrap_or_default())
        }
    }

    fn config() -> MeterConfig {
        MeterConfig {
            load_interval: std::time::Duration::from_secs(30),
            daily_ttl: std::time::Duration::from_secs(120),
            todays_ttl: std::time::Duration::from_secs(60),
            max_past_days: 30,
        }
    }

    fn today() -> DateTime<Utc> {
        start_of_day(Utc::now())
    }

    /// Store fixture from the aggregation scenarios: AppA has success=2 on
    /// each of the five days before today and success=50 today; AppB has
    /// success=7 yesterday.
    fn scenario_reporter() -> FakeReporter {
        let t = today();
        let mut daily = DailyCountMap::new();
        for d in 1..=5 {
            daily
                .entry(t - Duration::days(d))
                .or_default()
                .insert("app-a".into(), count(2, 0));
        }
        daily
            .entry(t - Duration::days(1))
            .or_default()
            .insert("app-b".into(), count(7, 0));

        FakeReporter {
            daily,
            today: TodayCountMap::from([("app-a".into(), count(50, 0))]),
            origins: OriginCountMap::from([("https://app.example.com".into(), count(12, 3))]),
            latency: LatencyMap::from([(
                "app-a".into(),
                vec![
                    LatencySample {
                        time: t + Duration::hours(2),
                        latency_ms: 110.0,
                    },
                    LatencySample {
                        time: t + Duration::hours(1),
                        latency_ms: 90.0,
                    },
                ],
            )]),
            ..Default::default()
        }
    }

    fn scenario_directory() -> FakeDirectory {
        FakeDirectory {
            apps: vec!["app-a".into(), "app-b".into()],
            users: HashMap::from([("user-1".into(), vec!["app-a".into(), "app-b".into()])]),
        }
    }

    async fn loaded_meter() -> Meter {
        let meter = Meter::new(
            Arc::new(scenario_reporter()),
            Arc::new(scenario_directory()),
            config(),
        );
        meter.load().await;
        meter
    }

    #[tokio::test]
    async fn test_basic_app_aggregation() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .portal_app_relays(
                "app-a",
                Some(t - Duration::days(5)),
                Some(t - Duration::days(1)),
            )
            .await
            .unwrap();

        assert_eq!(response.count, count(10, 0));
        assert_eq!(response.from, t - Duration::days(5));
        assert_eq!(response.to, t);
    }

    #[tokio::test]
    async fn test_today_inclusion() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .portal_app_relays("app-a", Some(t - Duration::days(3)), Some(t))
            .await
            .unwrap();

        assert_eq!(response.count, count(56, 0));
        assert_eq!(response.to, t + Duration::days(1));
    }

    #[tokio::test]
    async fn test_single_day_point_query() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .portal_app_relays(
                "app-a",
                Some(t - Duration::days(3)),
                Some(t - Duration::days(3)),
            )
            .await
            .unwrap();

        assert_eq!(response.count, count(2, 0));
        assert_eq!(response.from, t - Duration::days(3));
        assert_eq!(response.to, t - Duration::days(2));
    }

    #[tokio::test]
    async fn test_single_day_today_excludes_daily() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .portal_app_relays("app-a", Some(t), Some(t))
            .await
            .unwrap();

        // Only today's snapshot contributes; no daily day satisfies the
        // half-open range [today, tomorrow).
        assert_eq!(response.count, count(50, 0));
    }

    #[tokio::test]
    async fn test_future_to_includes_today_exactly_once() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .portal_app_relays("app-a", Some(t - Duration::days(1)), Some(t + Duration::days(3)))
            .await
            .unwrap();

        assert_eq!(response.count, count(52, 0));
    }

    #[tokio::test]
    async fn test_user_aggregation() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .user_relays(
                "user-1",
                Some(t - Duration::days(1)),
                Some(t - Duration::days(1)),
            )
            .await
            .unwrap();

        assert_eq!(response.count, count(9, 0));
        assert_eq!(response.portal_app_ids, vec!["app-a", "app-b"]);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let meter = loaded_meter().await;
        let t = today();

        let result = meter
            .portal_app_relays(
                "app-a",
                Some(t - Duration::days(1)),
                Some(t - Duration::days(2)),
            )
            .await;

        assert!(matches!(result, Err(MeterError::InvalidTimespan(_))));
    }

    #[tokio::test]
    async fn test_unknown_app_is_not_found() {
        let meter = loaded_meter().await;

        let result = meter.portal_app_relays("app-z", None, None).await;

        assert!(matches!(result, Err(MeterError::PortalAppNotFound(_))));
    }

    #[tokio::test]
    async fn test_total_equals_sum_over_apps() {
        let meter = loaded_meter().await;
        let t = today();
        let from = Some(t - Duration::days(5));
        let to = Some(t);

        let total = meter.total_relays(from, to).unwrap();
        let per_app = meter.all_portal_apps_relays(from, to).await.unwrap();
        let summed = per_app
            .iter()
            .fold(RelayCount::default(), |acc, r| acc + r.count);

        assert_eq!(total.count, summed);
    }

    #[tokio::test]
    async fn test_origin_range_without_today_is_empty() {
        let meter = loaded_meter().await;
        let t = today();

        let list = meter
            .all_relays_origin(Some(t - Duration::days(3)), Some(t - Duration::days(1)))
            .unwrap();

        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_origin_substring_match() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter
            .relays_origin("app.example", Some(t), Some(t))
            .unwrap();

        assert_eq!(response.origin, "https://app.example.com");
        assert_eq!(response.count, count(12, 3));

        let miss = meter.relays_origin("nowhere", Some(t), Some(t)).unwrap();
        assert_eq!(miss.origin, "nowhere");
        assert_eq!(miss.count, RelayCount::default());
    }

    #[tokio::test]
    async fn test_app_latency_sorts_samples() {
        let meter = loaded_meter().await;
        let t = today();

        let response = meter.app_latency("app-a").unwrap();

        assert_eq!(response.daily_latency.len(), 2);
        assert_eq!(response.from, t + Duration::hours(1));
        assert_eq!(response.to, t + Duration::hours(2));
        assert!(response.daily_latency[0].time <= response.daily_latency[1].time);
    }

    #[tokio::test]
    async fn test_app_latency_missing_app() {
        let meter = loaded_meter().await;

        assert!(matches!(
            meter.app_latency("app-b"),
            Err(MeterError::AppLatencyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_all_apps_latencies_skips_empty() {
        let mut reporter = scenario_reporter();
        reporter.latency.insert("app-b".into(), Vec::new());
        let meter = Meter::new(Arc::new(reporter), Arc::new(scenario_directory()), config());
        meter.load().await;

        let list = meter.all_apps_latencies();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].portal_app_id, "app-a");
    }

    #[tokio::test]
    async fn test_failed_daily_load_leaves_cache_empty() {
        let reporter = FakeReporter {
            fail_daily: true,
            ..Default::default()
        };
        let meter = Meter::new(Arc::new(reporter), Arc::new(FakeDirectory::default()), config());
        meter.load().await;

        let response = meter.total_relays(None, None).unwrap();
        assert_eq!(response.count, RelayCount::default());
        // TTLs did not advance, so the next load retries both halves.
        let cache = meter.cache.read();
        assert_eq!(cache.daily_expires_at, DateTime::UNIX_EPOCH);
        assert_eq!(cache.today_expires_at, DateTime::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn test_latency_failure_is_non_fatal() {
        let mut reporter = scenario_reporter();
        reporter.fail_latency = true;
        let meter = Meter::new(Arc::new(reporter), Arc::new(scenario_directory()), config());
        meter.load().await;

        // Today's counts still refreshed; latency is simply absent.
        let response = meter.total_relays(Some(today()), Some(today())).unwrap();
        assert_eq!(response.count, count(50, 0));
        assert!(matches!(
            meter.app_latency("app-a"),
            Err(MeterError::AppLatencyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_fresh_halves_are_not_reloaded() {
        let meter = loaded_meter().await;

        // Cached snapshot survives a second load within both TTLs even
        // though the reporter would now serve nothing.
        let empty = FakeReporter::default();
        let refreshed = Meter {
            reporter: Arc::new(empty),
            apps: Arc::new(scenario_directory()),
            cache: RwLock::new(CachedUsage::default()),
            load_interval: meter.load_interval,
            daily_ttl: meter.daily_ttl,
            todays_ttl: meter.todays_ttl,
            max_past: meter.max_past,
        };
        {
            let mut dst = refreshed.cache.write();
            let src = meter.cache.read();
            dst.daily_usage = src.daily_usage.clone();
            dst.todays_usage = src.todays_usage.clone();
            dst.todays_origin_usage = src.todays_origin_usage.clone();
            dst.todays_latency = src.todays_latency.clone();
            dst.daily_expires_at = src.daily_expires_at;
            dst.today_expires_at = src.today_expires_at;
        }

        refreshed.load().await;

        let response = refreshed.total_relays(Some(today()), Some(today())).unwrap();
        assert_eq!(response.count, count(50, 0));
    }

    #[tokio::test]
    async fn test_zero_config_falls_back_to_defaults() {
        let meter = Meter::new(
            Arc::new(FakeReporter::default()),
            Arc::new(FakeDirectory::default()),
            MeterConfig {
                load_interval: std::time::Duration::from_secs(30),
                daily_ttl: std::time::Duration::ZERO,
                todays_ttl: std::time::Duration::ZERO,
                max_past_days: 0,
            },
        );

        assert_eq!(meter.daily_ttl, Duration::seconds(900));
        assert_eq!(meter.todays_ttl, Duration::seconds(600));
        assert_eq!(meter.max_past, Duration::days(30));
    }

    #[tokio::test]
    async fn test_loader_task_populates_and_stops() {
        let meter = Arc::new(Meter::new(
            Arc::new(scenario_reporter()),
            Arc::new(scenario_directory()),
            config(),
        ));
        let (tx, rx) = watch::channel(false);

        let handle = meter.start_loader(rx);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let response = meter.total_relays(Some(today()), Some(today())).unwrap();
        assert_eq!(response.count, count(50, 0));

        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
