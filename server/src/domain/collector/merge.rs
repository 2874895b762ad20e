//! Merge functions for per-source maps
//!
//! All four are associative and commutative, so operators can add or remove
//! a source without changing results on days where only one source
//! contributed. Counts sum componentwise; latency samples concatenate
//! without reduction (the meter cache re-sorts on emission).

use crate::data::types::{DailyCountMap, LatencyMap, OriginCountMap, TodayCountMap};

/// Combine per-source daily maps: group by day, then by app, summing counts.
pub fn merge_daily<I: IntoIterator<Item = DailyCountMap>>(maps: I) -> DailyCountMap {
    let mut merged = DailyCountMap::new();
    for map in maps {
        for (day, apps) in map {
            let merged_apps = merged.entry(day).or_default();
            for (app_key, count) in apps {
                *merged_apps.entry(app_key).or_default() += count;
            }
        }
    }
    merged
}

/// Combine per-source today maps: group by app, summing counts.
pub fn merge_today<I: IntoIterator<Item = TodayCountMap>>(maps: I) -> TodayCountMap {
    let mut merged = TodayCountMap::new();
    for map in maps {
        for (app_key, count) in map {
            *merged.entry(app_key).or_default() += count;
        }
    }
    merged
}

/// Combine per-source origin maps: group by origin, summing counts.
pub fn merge_origin<I: IntoIterator<Item = OriginCountMap>>(maps: I) -> OriginCountMap {
    let mut merged = OriginCountMap::new();
    for map in maps {
        for (origin, count) in map {
            *merged.entry(origin).or_default() += count;
        }
    }
    merged
}

/// Combine per-source latency maps: group by app, concatenating samples.
pub fn merge_latency<I: IntoIterator<Item = LatencyMap>>(maps: I) -> LatencyMap {
    let mut merged = LatencyMap::new();
    for map in maps {
        for (app_key, mut samples) in map {
            merged.entry(app_key).or_default().append(&mut samples);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{LatencySample, RelayCount};
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn count(success: u64, failure: u64) -> RelayCount {
        RelayCount { success, failure }
    }

    fn daily(entries: &[(u32, &str, u64, u64)]) -> DailyCountMap {
        let mut map = DailyCountMap::new();
        for &(d, app, s, f) in entries {
            map.entry(day(d))
                .or_default()
                .insert(app.to_string(), count(s, f));
        }
        map
    }

    #[test]
    fn test_merge_daily_sums_shared_keys() {
        let a = daily(&[(1, "app-a", 2, 1), (2, "app-a", 5, 0)]);
        let b = daily(&[(1, "app-a", 3, 3), (1, "app-b", 7, 0)]);

        let merged = merge_daily([a, b]);

        assert_eq!(merged[&day(1)]["app-a"], count(5, 4));
        assert_eq!(merged[&day(1)]["app-b"], count(7, 0));
        assert_eq!(merged[&day(2)]["app-a"], count(5, 0));
    }

    #[test]
    fn test_merge_daily_is_associative() {
        let a = daily(&[(1, "app-a", 2, 1)]);
        let b = daily(&[(1, "app-a", 3, 0), (2, "app-b", 4, 4)]);
        let c = daily(&[(2, "app-b", 1, 0), (3, "app-c", 9, 9)]);

        let left = merge_daily([merge_daily([a.clone(), b.clone()]), c.clone()]);
        let right = merge_daily([a.clone(), merge_daily([b.clone(), c.clone()])]);
        let flat = merge_daily([a, b, c]);

        assert_eq!(left, right);
        assert_eq!(left, flat);
    }

    #[test]
    fn test_merge_daily_is_commutative() {
        let a = daily(&[(1, "app-a", 2, 1), (2, "app-b", 5, 5)]);
        let b = daily(&[(1, "app-a", 3, 0)]);

        assert_eq!(merge_daily([a.clone(), b.clone()]), merge_daily([b, a]));
    }

    #[test]
    fn test_merge_today_sums_shared_apps() {
        let a = TodayCountMap::from([("app-a".into(), count(10, 2))]);
        let b = TodayCountMap::from([
            ("app-a".into(), count(1, 1)),
            ("app-b".into(), count(4, 0)),
        ]);

        let merged = merge_today([a, b]);

        assert_eq!(merged["app-a"], count(11, 3));
        assert_eq!(merged["app-b"], count(4, 0));
    }

    #[test]
    fn test_merge_origin_sums_shared_origins() {
        let a = OriginCountMap::from([("https://example.com".into(), count(3, 0))]);
        let b = OriginCountMap::from([("https://example.com".into(), count(2, 1))]);

        let merged = merge_origin([a, b]);

        assert_eq!(merged["https://example.com"], count(5, 1));
    }

    #[test]
    fn test_merge_latency_concatenates_without_sorting() {
        let later = LatencySample {
            time: day(2),
            latency_ms: 80.0,
        };
        let earlier = LatencySample {
            time: day(1),
            latency_ms: 120.0,
        };
        let a = LatencyMap::from([("app-a".into(), vec![later])]);
        let b = LatencyMap::from([("app-a".into(), vec![earlier])]);

        let merged = merge_latency([a, b]);

        // Concatenation order is preserved; no reduction, no sorting.
        assert_eq!(merged["app-a"], vec![later, earlier]);
    }

    #[test]
    fn test_merge_empty_input_yields_empty_map() {
        assert!(merge_daily(Vec::new()).is_empty());
        assert!(merge_today(Vec::new()).is_empty());
        assert!(merge_origin(Vec::new()).is_empty());
        assert!(merge_latency(Vec::new()).is_empty());
    }
}
