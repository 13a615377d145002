//! Feature vectors and sample selection.
//!
//! Raw readings pass through unchanged: no smoothing, no outlier rejection.
//! The only derived feature is the forward-looking pressure trend.
//!
//! # Clock injection
//! [`closest_index`] takes `now` as a parameter rather than calling
//! `Utc::now()`, so sample selection is deterministic in tests.

use crate::model::{FeatureVector, HourlySeries, WeatherSample};
use chrono::{DateTime, FixedOffset, Utc};

/// Hours ahead used for the pressure trend.
pub const TREND_HORIZON_HOURS: usize = 3;

/// pressure[i+3] - pressure[i] if index i+3 exists, else 0.0.
pub fn pressure_trend(pressure: &[f64], i: usize) -> f64 {
    match (pressure.get(i), pressure.get(i + TREND_HORIZON_HOURS)) {
        (Some(now), Some(ahead)) => ahead - now,
        _ => 0.0,
    }
}

/// Builds the feature vector for index `i`, or `None` if `i` is out of range.
pub fn feature_vector(series: &HourlySeries, i: usize) -> Option<FeatureVector> {
    if i >= series.len() {
        return None;
    }
    Some(FeatureVector {
        pressure: series.pressure[i],
        precipitation: series.precipitation[i],
        humidity: series.humidity[i],
        pressure_trend: pressure_trend(&series.pressure, i),
    })
}

/// Index of the point whose timestamp is closest to `now`.
///
/// Ties go to the earlier point. Returns `None` for an empty slice.
pub fn closest_index(times: &[DateTime<Utc>], now: DateTime<Utc>) -> Option<usize> {
    times
        .iter()
        .enumerate()
        .min_by_key(|(_, t)| (**t - now).num_seconds().unsigned_abs())
        .map(|(i, _)| i)
}

/// Materialises the sample at index `i` with its local timestamp.
pub fn sample_at(
    series: &HourlySeries,
    i: usize,
    local_offset: FixedOffset,
) -> Option<WeatherSample> {
    let timestamp_utc = *series.times.get(i)?;
    Some(WeatherSample {
        pressure: series.pressure[i],
        precipitation: series.precipitation[i],
        humidity: series.humidity[i],
        timestamp_utc,
        timestamp_local: timestamp_utc.with_timezone(&local_offset),
        source_index: i,
    })
}

/// Selects the sample closest to `now` and builds its features.
pub fn current_observation(
    series: &HourlySeries,
    now: DateTime<Utc>,
    local_offset: FixedOffset,
) -> Option<(WeatherSample, FeatureVector)> {
    let idx = closest_index(&series.times, now)?;
    let sample = sample_at(series, idx, local_offset)?;
    let features = feature_vector(series, idx)?;
    Some((sample, features))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()
    }

    fn series_with_pressure(pressure: Vec<f64>) -> HourlySeries {
        let n = pressure.len();
        let times = (0..n).map(|h| start() + Duration::hours(h as i64)).collect();
        HourlySeries::from_parts(times, pressure, vec![0.2; n], vec![80.0; n]).unwrap()
    }

    fn pkt() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    #[test]
    fn test_trend_is_forward_difference_when_in_range() {
        let p = [1010.0, 1009.0, 1008.0, 1005.5, 1004.0];
        assert_eq!(pressure_trend(&p, 0), 1005.5 - 1010.0);
        assert_eq!(pressure_trend(&p, 1), 1004.0 - 1009.0);
    }

    #[test]
    fn test_trend_is_zero_when_horizon_leaves_window() {
        let p = [1010.0, 1009.0, 1008.0, 1005.5, 1004.0];
        assert_eq!(pressure_trend(&p, 2), 0.0);
        assert_eq!(pressure_trend(&p, 4), 0.0);
        assert_eq!(pressure_trend(&p, 10), 0.0);
    }

    #[test]
    fn test_trend_matches_definition_for_every_index() {
        let p: Vec<f64> = (0..24).map(|h| 1000.0 + (h as f64 * 0.7).sin() * 4.0).collect();
        for i in 0..p.len() {
            let expected = if i + 3 < p.len() { p[i + 3] - p[i] } else { 0.0 };
            assert_eq!(pressure_trend(&p, i), expected, "index {}", i);
        }
    }

    #[test]
    fn test_feature_vector_passes_raw_readings_through() {
        let series = series_with_pressure(vec![1003.0, 1002.0, 1001.0, 999.0]);
        let v = feature_vector(&series, 0).expect("index 0 is in range");
        assert_eq!(v.pressure, 1003.0);
        assert_eq!(v.precipitation, 0.2);
        assert_eq!(v.humidity, 80.0);
        assert_eq!(v.pressure_trend, -4.0);
    }

    #[test]
    fn test_feature_vector_out_of_range_is_none() {
        let series = series_with_pressure(vec![1003.0]);
        assert!(feature_vector(&series, 1).is_none());
    }

    #[test]
    fn test_closest_index_picks_nearest_hour() {
        let times: Vec<_> = (0..24).map(|h| start() + Duration::hours(h)).collect();
        let now = start() + Duration::hours(6) + Duration::minutes(20);
        assert_eq!(closest_index(&times, now), Some(6));

        let now = start() + Duration::hours(6) + Duration::minutes(40);
        assert_eq!(closest_index(&times, now), Some(7));
    }

    #[test]
    fn test_closest_index_tie_goes_to_earlier_point() {
        let times: Vec<_> = (0..3).map(|h| start() + Duration::hours(h)).collect();
        let now = start() + Duration::minutes(30);
        assert_eq!(closest_index(&times, now), Some(0));
    }

    #[test]
    fn test_closest_index_clamps_outside_window() {
        let times: Vec<_> = (0..3).map(|h| start() + Duration::hours(h)).collect();
        assert_eq!(closest_index(&times, start() - Duration::days(2)), Some(0));
        assert_eq!(closest_index(&times, start() + Duration::days(2)), Some(2));
        assert_eq!(closest_index(&[], start()), None);
    }

    #[test]
    fn test_sample_carries_local_time_and_index() {
        let series = series_with_pressure(vec![1003.0, 1002.0]);
        let sample = sample_at(&series, 1, pkt()).expect("index 1 exists");
        assert_eq!(sample.source_index, 1);
        assert_eq!(sample.pressure, 1002.0);
        assert_eq!(sample.timestamp_local.to_rfc3339(), "2024-08-01T06:00:00+05:00");
    }

    #[test]
    fn test_current_observation_combines_selection_and_features() {
        let series = series_with_pressure(vec![1005.0, 1004.0, 1003.0, 1002.0, 1000.0, 998.0]);
        let now = start() + Duration::hours(1) + Duration::minutes(5);
        let (sample, features) = current_observation(&series, now, pkt()).unwrap();
        assert_eq!(sample.source_index, 1);
        assert_eq!(features.pressure_trend, 1000.0 - 1004.0);
    }
}
