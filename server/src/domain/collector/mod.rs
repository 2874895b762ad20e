//! Relay usage collector
//!
//! Periodically pulls relay counts from every upstream source, merges them
//! across sources, and writes them to the durable store: a destructive
//! refresh of the today tables on every tick, followed by a gap-fill of the
//! historical daily record. Runs as its own process sharing only the
//! durable store with the meter.

pub mod merge;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::data::traits::{RelaySource, UsageWriter};
use crate::data::types::{LatencyMap, OriginCountMap, TodayCountMap};
use crate::utils::time::{normalize_timespan, start_of_day};
use merge::{merge_daily, merge_latency, merge_origin, merge_today};

pub struct Collector {
    sources: Vec<Arc<dyn RelaySource>>,
    writer: Arc<dyn UsageWriter>,
    max_archive_age: Duration,
    collect_interval: std::time::Duration,
    report_interval: std::time::Duration,
}

impl Collector {
    pub fn new(
        sources: Vec<Arc<dyn RelaySource>>,
        writer: Arc<dyn UsageWriter>,
        max_archive_age: Duration,
        collect_interval: std::time::Duration,
        report_interval: std::time::Duration,
    ) -> Result<Self> {
        if sources.is_empty() {
            bail!("collector requires at least one relay source");
        }
        Ok(Self {
            sources,
            writer,
            max_archive_age,
            collect_interval,
            report_interval,
        })
    }

    /// Run the collection loop until shutdown
    ///
    /// One collection fires immediately on startup, then two tickers drive
    /// the loop: a collect tick and a lighter progress-report tick. A failed
    /// tick is logged and the next one runs normally; the loop only exits on
    /// the shutdown signal.
    pub fn start(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.collect().await;

            let mut collect_timer = tokio::time::interval(self.collect_interval);
            collect_timer.tick().await; // Skip immediate first tick
            let mut report_timer = tokio::time::interval(self.report_interval);
            report_timer.tick().await;
            let mut last_collect = Instant::now();

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Collector shutting down");
                            break;
                        }
                    }
                    _ = collect_timer.tick() => {
                        self.collect().await;
                        last_collect = Instant::now();
                    }
                    _ = report_timer.tick() => {
                        let remaining = self.collect_interval.saturating_sub(last_collect.elapsed());
                        tracing::info!(
                            seconds_until_next_collection = remaining.as_secs(),
                            "Collector waiting"
                        );
                    }
                }
            }
        })
    }

    /// One collection tick: refresh today, then fill historical gaps
    async fn collect(&self) {
        if let Err(e) = self.collect_todays_usage().await {
            tracing::error!(error = %e, "Today's usage collection failed");
            return;
        }
        if let Err(e) = self.fill_missing_days().await {
            tracing::error!(error = %e, "Historical gap-fill failed");
        }
    }

    /// Pull today's partial buckets from every source and rewrite the today
    /// tables wholesale.
    ///
    /// Per-origin counts are authoritative for billing, so a source failing
    /// that query aborts the tick. Today's usage and latency are
    /// best-effort: a failing source contributes nothing this cycle.
    async fn collect_todays_usage(&self) -> Result<()> {
        let mut counts = Vec::with_capacity(self.sources.len());
        let mut origins = Vec::with_capacity(self.sources.len());
        let mut latencies = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match source.todays_counts().await {
                Ok(map) => counts.push(map),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Today's counts unavailable");
                }
            }

            origins.push(
                source
                    .todays_counts_per_origin()
                    .await
                    .with_context(|| format!("today's origin counts from {}", source.name()))?,
            );

            match source.todays_latency().await {
                Ok(map) => latencies.push(map),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Today's latency unavailable");
                }
            }
        }

        let counts: TodayCountMap = merge_today(counts);
        let origins: OriginCountMap = merge_origin(origins);
        let latencies: LatencyMap = merge_latency(latencies);

        tracing::debug!(
            apps = counts.len(),
            origins = origins.len(),
            "Writing today's metrics"
        );

        self.writer
            .write_todays_metrics(&counts, &origins, &latencies)
            .await
            .context("writing today's metrics")?;
        Ok(())
    }

    /// Backfill any days missing between the persisted range and yesterday
    ///
    /// The persisted timespan is gap-free, so the only possible hole is at
    /// its end: whenever the collector was offline for N days, the first
    /// successful tick backfills exactly `[last + 1, yesterday]`. On an
    /// empty store the backfill window opens at `now - max_archive_age`.
    async fn fill_missing_days(&self) -> Result<()> {
        let now = Utc::now();
        let today = start_of_day(now);

        let gap_from = match self
            .writer
            .existing_metrics_timespan()
            .await
            .context("reading persisted timespan")?
        {
            Some((_, last)) if start_of_day(last) >= today - Duration::days(1) => {
                tracing::debug!("Daily store is up to date");
                return Ok(());
            }
            Some((_, last)) => {
                let next = start_of_day(last) + Duration::days(1);
                next.min(today)
            }
            None => now - self.max_archive_age,
        };

        self.collect_daily_usage(Some(gap_from), Some(now - Duration::days(1)))
            .await
    }

    /// Collect and persist daily buckets for the given inclusive range
    ///
    /// Also serves as the operator-facing manual backfill entry point; a
    /// range overlapping already-persisted days duplicates rows, which the
    /// interval loop never does because gap-fill starts at `last + 1 day`.
    pub async fn collect_daily_usage(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let (from, to) = normalize_timespan(from, to, self.max_archive_age)
            .context("normalizing backfill range")?;

        let mut maps = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            maps.push(
                source
                    .daily_counts(from, to)
                    .await
                    .with_context(|| format!("daily counts from {}", source.name()))?,
            );
        }

        let merged = merge_daily(maps);
        let days = merged.len();

        self.writer
            .write_daily_usage(&merged, &OriginCountMap::new())
            .await
            .context("writing daily usage")?;

        tracing::info!(days, %from, %to, "Persisted daily usage");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    use crate::data::error::DataError;
    use crate::data::types::{DailyCountMap, IngestRecord, RelayCount};

    fn count(success: u64, failure: u64) -> RelayCount {
        RelayCount { success, failure }
    }

    /// Source serving fixed maps, with per-query failure switches
    #[derive(Default)]
    struct FakeSource {
        daily: DailyCountMap,
        today: TodayCountMap,
        origins: OriginCountMap,
        latency: LatencyMap,
        fail_daily: bool,
        fail_today: bool,
        fail_origins: bool,
        fail_latency: bool,
    }

    fn io_error() -> DataError {
        DataError::Config("source offline".into())
    }

    #[async_trait]
    impl RelaySource for FakeSource {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn daily_counts(
            &self,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<DailyCountMap, DataError> {
            if self.fail_daily {
                return Err(io_error());
            }
            Ok(self
                .daily
                .iter()
                .filter(|(day, _)| **day >= from && **day < to)
                .map(|(day, apps)| (*day, apps.clone()))
                .collect())
        }

        async fn todays_counts(&self) -> Result<TodayCountMap, DataError> {
            if self.fail_today {
                return Err(io_error());
            }
            Ok(self.today.clone())
        }

        async fn todays_counts_per_origin(&self) -> Result<OriginCountMap, DataError> {
            if self.fail_origins {
                return Err(io_error());
            }
            Ok(self.origins.clone())
        }

        async fn todays_latency(&self) -> Result<LatencyMap, DataError> {
            if self.fail_latency {
                return Err(io_error());
            }
            Ok(self.latency.clone())
        }
    }

    /// Writer recording every call for assertions
    #[derive(Default)]
    struct RecordingWriter {
        timespan: Mutex<Option<(DateTime<Utc>, DateTime<Utc>)>>,
        daily_writes: Mutex<Vec<DailyCountMap>>,
        today_writes: Mutex<Vec<(TodayCountMap, OriginCountMap, LatencyMap)>>,
    }

    #[async_trait]
    impl UsageWriter for RecordingWriter {
        async fn existing_metrics_timespan(
            &self,
        ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, DataError> {
            Ok(*self.timespan.lock())
        }

        async fn write_daily_usage(
            &self,
            counts: &DailyCountMap,
            _origins: &OriginCountMap,
        ) -> Result<(), DataError> {
            self.daily_writes.lock().push(counts.clone());
            Ok(())
        }

        async fn write_todays_metrics(
            &self,
            counts: &TodayCountMap,
            origins: &OriginCountMap,
            latencies: &LatencyMap,
        ) -> Result<(), DataError> {
            self.today_writes
                .lock()
                .push((counts.clone(), origins.clone(), latencies.clone()));
            Ok(())
        }

        async fn write_ingest_counts(&self, _records: &[IngestRecord]) -> Result<(), DataError> {
            Ok(())
        }
    }

    fn collector(
        sources: Vec<Arc<dyn RelaySource>>,
        writer: Arc<RecordingWriter>,
    ) -> Collector {
        Collector::new(
            sources,
            writer,
            Duration::days(30),
            std::time::Duration::from_secs(300),
            std::time::Duration::from_secs(30),
        )
        .unwrap()
    }

    fn daily_for_days(days: &[DateTime<Utc>], app: &str, success: u64) -> DailyCountMap {
        days.iter()
            .map(|day| {
                (
                    *day,
                    HashMap::from([(app.to_string(), count(success, 0))]),
                )
            })
            .collect()
    }

    #[test]
    fn test_new_rejects_empty_sources() {
        let writer = Arc::new(RecordingWriter::default());
        assert!(
            Collector::new(
                Vec::new(),
                writer,
                Duration::days(30),
                std::time::Duration::from_secs(300),
                std::time::Duration::from_secs(30),
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_todays_usage_merges_sources_and_writes() {
        let a = FakeSource {
            today: TodayCountMap::from([("app-a".into(), count(10, 1))]),
            origins: OriginCountMap::from([("https://a.example".into(), count(5, 0))]),
            ..Default::default()
        };
        let b = FakeSource {
            today: TodayCountMap::from([("app-a".into(), count(3, 0))]),
            ..Default::default()
        };
        let writer = Arc::new(RecordingWriter::default());
        let collector = collector(vec![Arc::new(a), Arc::new(b)], writer.clone());

        collector.collect_todays_usage().await.unwrap();

        let writes = writer.today_writes.lock();
        assert_eq!(writes.len(), 1);
        let (counts, origins, _) = &writes[0];
        assert_eq!(counts["app-a"], count(13, 1));
        assert_eq!(origins["https://a.example"], count(5, 0));
    }

    #[tokio::test]
    async fn test_todays_counts_failure_is_best_effort() {
        let broken = FakeSource {
            fail_today: true,
            fail_latency: true,
            ..Default::default()
        };
        let healthy = FakeSource {
            today: TodayCountMap::from([("app-a".into(), count(7, 0))]),
            ..Default::default()
        };
        let writer = Arc::new(RecordingWriter::default());
        let collector = collector(vec![Arc::new(broken), Arc::new(healthy)], writer.clone());

        collector.collect_todays_usage().await.unwrap();

        let writes = writer.today_writes.lock();
        assert_eq!(writes[0].0["app-a"], count(7, 0));
    }

    #[tokio::test]
    async fn test_origin_failure_aborts_tick() {
        let broken = FakeSource {
            fail_origins: true,
            ..Default::default()
        };
        let writer = Arc::new(RecordingWriter::default());
        let collector = collector(vec![Arc::new(broken)], writer.clone());

        assert!(collector.collect_todays_usage().await.is_err());
        assert!(writer.today_writes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_gap_fill_backfills_missing_days() {
        // Store holds [T-10, T-5]; one tick must write exactly [T-4, T-1].
        let today = start_of_day(Utc::now());
        let missing: Vec<_> = (1..=4).map(|d| today - Duration::days(d)).collect();

        let source = FakeSource {
            daily: daily_for_days(&missing, "app-a", 2),
            ..Default::default()
        };
        let writer = Arc::new(RecordingWriter::default());
        *writer.timespan.lock() =
            Some((today - Duration::days(10), today - Duration::days(5)));
        let collector = collector(vec![Arc::new(source)], writer.clone());

        collector.fill_missing_days().await.unwrap();

        let writes = writer.daily_writes.lock();
        assert_eq!(writes.len(), 1);
        let mut written: Vec<_> = writes[0].keys().copied().collect();
        written.sort();
        let mut expected = missing.clone();
        expected.sort();
        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn test_gap_fill_skips_when_up_to_date() {
        let today = start_of_day(Utc::now());
        let writer = Arc::new(RecordingWriter::default());
        *writer.timespan.lock() =
            Some((today - Duration::days(10), today - Duration::days(1)));
        let source = FakeSource::default();
        let collector = collector(vec![Arc::new(source)], writer.clone());

        collector.fill_missing_days().await.unwrap();

        assert!(writer.daily_writes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_gap_fill_on_empty_store_uses_archive_age() {
        let today = start_of_day(Utc::now());
        let archived: Vec<_> = (1..=30).map(|d| today - Duration::days(d)).collect();
        let source = FakeSource {
            daily: daily_for_days(&archived, "app-a", 1),
            ..Default::default()
        };
        let writer = Arc::new(RecordingWriter::default());
        let collector = collector(vec![Arc::new(source)], writer.clone());

        collector.fill_missing_days().await.unwrap();

        let writes = writer.daily_writes.lock();
        assert_eq!(writes.len(), 1);
        // Every archived day up to yesterday lands; today is never written.
        assert_eq!(writes[0].len(), 30);
        assert!(!writes[0].contains_key(&today));
    }

    #[tokio::test]
    async fn test_daily_source_failure_aborts_backfill() {
        let broken = FakeSource {
            fail_daily: true,
            ..Default::default()
        };
        let writer = Arc::new(RecordingWriter::default());
        let collector = collector(vec![Arc::new(broken)], writer.clone());

        let today = start_of_day(Utc::now());
        let result = collector
            .collect_daily_usage(
                Some(today - Duration::days(3)),
                Some(today - Duration::days(1)),
            )
            .await;

        assert!(result.is_err());
        assert!(writer.daily_writes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_collect_daily_usage_rejects_inverted_range() {
        let source = FakeSource::default();
        let writer = Arc::new(RecordingWriter::default());
        let collector = collector(vec![Arc::new(source)], writer.clone());

        let today = start_of_day(Utc::now());
        let result = collector
            .collect_daily_usage(
                Some(today - Duration::days(1)),
                Some(today - Duration::days(2)),
            )
            .await;

        assert!(result.is_err());
    }
}
