//! Rule-based labels for historical training rows.
//!
//! These thresholds only label training data. Live inference always goes
//! through the trained classifier.

use super::features::feature_vector;
use crate::model::{HourlySeries, RiskLabel, TrainingRow};

/// Precipitation at or above this (inch/hr) is a warning on its own.
pub const WARNING_PRECIP_IN: f64 = 1.0;
/// Pressure at or below this (hPa) is a warning on its own.
pub const WARNING_PRESSURE_HPA: f64 = 1000.0;
/// Inclusive precipitation band (inch/hr) for a watch.
pub const WATCH_PRECIP_BAND_IN: (f64, f64) = (0.4, 0.9);
/// A watch also needs pressure strictly below this (hPa).
pub const WATCH_PRESSURE_BELOW_HPA: f64 = 1005.0;

/// Labels a single reading.
///
/// Resolution order: start at NORMAL, apply the watch condition, then apply
/// the warning condition, which overwrites a watch.
pub fn label_for(precipitation: f64, pressure: f64) -> RiskLabel {
    let mut label = RiskLabel::Normal;

    let (low, high) = WATCH_PRECIP_BAND_IN;
    if (low..=high).contains(&precipitation) && pressure < WATCH_PRESSURE_BELOW_HPA {
        label = RiskLabel::Watch;
    }
    if precipitation >= WARNING_PRECIP_IN || pressure <= WARNING_PRESSURE_HPA {
        label = RiskLabel::Warning;
    }

    label
}

/// Builds one labeled training row per hour of a historical series.
pub fn labeled_rows(series: &HourlySeries) -> Vec<TrainingRow> {
    (0..series.len())
        .filter_map(|i| feature_vector(series, i))
        .map(|features| TrainingRow {
            label: label_for(features.precipitation, features.pressure),
            features,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_heavy_rain_alone_is_warning() {
        assert_eq!(label_for(1.2, 1010.0), RiskLabel::Warning);
    }

    #[test]
    fn test_low_pressure_alone_is_warning() {
        assert_eq!(label_for(0.0, 1000.0), RiskLabel::Warning);
        assert_eq!(label_for(0.0, 995.0), RiskLabel::Warning);
    }

    #[test]
    fn test_moderate_rain_with_falling_pressure_is_watch() {
        assert_eq!(label_for(0.6, 1003.0), RiskLabel::Watch);
        assert_eq!(label_for(0.4, 1004.9), RiskLabel::Watch, "band is inclusive at 0.4");
        assert_eq!(label_for(0.9, 1001.0), RiskLabel::Watch, "band is inclusive at 0.9");
    }

    #[test]
    fn test_moderate_rain_with_normal_pressure_is_normal() {
        assert_eq!(label_for(0.6, 1005.0), RiskLabel::Normal);
    }

    #[test]
    fn test_light_rain_high_pressure_is_normal() {
        assert_eq!(label_for(0.1, 1015.0), RiskLabel::Normal);
    }

    #[test]
    fn test_warning_overrides_watch() {
        // Inside the watch band, but pressure also at the warning floor.
        assert_eq!(label_for(0.5, 999.0), RiskLabel::Warning);
    }

    #[test]
    fn test_gap_between_watch_band_and_warning_threshold_is_normal() {
        // 0.95 is above the watch band and below the warning threshold.
        assert_eq!(label_for(0.95, 1002.0), RiskLabel::Normal);
    }

    #[test]
    fn test_labeled_rows_cover_every_hour() {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap();
        let times = (0..5).map(|h| start + Duration::hours(h)).collect();
        let series = HourlySeries::from_parts(
            times,
            vec![1010.0, 1003.0, 999.0, 1008.0, 1012.0],
            vec![0.0, 0.6, 0.2, 1.4, 0.0],
            vec![60.0, 85.0, 90.0, 97.0, 55.0],
        )
        .unwrap();

        let rows = labeled_rows(&series);
        let labels: Vec<_> = rows.iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec![
                RiskLabel::Normal,
                RiskLabel::Watch,
                RiskLabel::Warning,
                RiskLabel::Warning,
                RiskLabel::Normal
            ]
        );
        assert_eq!(rows[0].features.pressure_trend, 1008.0 - 1010.0);
        assert_eq!(rows[4].features.pressure_trend, 0.0);
    }
}
