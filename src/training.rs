//! Training set construction.
//!
//! Real historical rows (labeled by rule) are skewed heavily toward NORMAL,
//! so they are blended with three class-balanced synthetic clusters before
//! fitting. This module is pure data construction: it knows nothing about
//! the classifier that consumes its output.

use crate::model::{FeatureVector, RiskLabel, TrainingRow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Normal, Uniform};
use serde::Deserialize;
use thiserror::Error;

/// Errors that abort model construction. Always fatal at startup.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("historical weather fetch failed: {0}")]
    Source(#[from] crate::ingest::WeatherError),
    #[error("invalid synthetic distribution: {0}")]
    InvalidDistribution(String),
    #[error("training set is empty")]
    EmptyDataset,
}

/// Knobs for dataset construction and the ensemble fit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Synthetic rows generated per risk level.
    pub synthetic_per_class: usize,
    /// Fraction of the blended set held out for accuracy reporting.
    pub test_fraction: f64,
    /// Seed for synthetic sampling, the holdout shuffle, and bagging.
    pub seed: u64,
    pub n_estimators: usize,
    pub max_depth: usize,
    /// Days of hourly history fetched for the real-data component.
    pub history_days: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            synthetic_per_class: 50,
            test_fraction: 0.2,
            seed: 42,
            n_estimators: 100,
            max_depth: 5,
            history_days: 92,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic clusters
// ---------------------------------------------------------------------------

/// Sampling parameters for one risk level.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticCluster {
    pub label: RiskLabel,
    /// (mean, std dev), hPa.
    pub pressure: (f64, f64),
    /// Uniform [low, high), inch/hr.
    pub precipitation: (f64, f64),
    /// (mean, std dev), %.
    pub humidity: (f64, f64),
    /// (mean, std dev), hPa over 3h.
    pub pressure_trend: (f64, f64),
}

pub const SYNTHETIC_CLUSTERS: [SyntheticCluster; RiskLabel::COUNT] = [
    SyntheticCluster {
        label: RiskLabel::Normal,
        pressure: (1010.0, 3.0),
        precipitation: (0.0, 0.3),
        humidity: (65.0, 8.0),
        pressure_trend: (0.0, 0.8),
    },
    SyntheticCluster {
        label: RiskLabel::Watch,
        pressure: (1002.0, 2.0),
        precipitation: (0.4, 0.9),
        humidity: (85.0, 5.0),
        pressure_trend: (-1.5, 0.6),
    },
    SyntheticCluster {
        label: RiskLabel::Warning,
        pressure: (995.0, 3.0),
        precipitation: (1.0, 3.5),
        humidity: (95.0, 3.0),
        pressure_trend: (-5.0, 1.5),
    },
];

fn normal(
    label: RiskLabel,
    name: &str,
    (mean, std): (f64, f64),
) -> Result<Normal<f64>, TrainError> {
    Normal::new(mean, std).map_err(|e| {
        TrainError::InvalidDistribution(format!("{} {}: {}", label, name, e))
    })
}

fn uniform(label: RiskLabel, (low, high): (f64, f64)) -> Result<Uniform<f64>, TrainError> {
    if !(low < high) {
        return Err(TrainError::InvalidDistribution(format!(
            "{} precipitation: empty range [{}, {})",
            label, low, high
        )));
    }
    Ok(Uniform::new(low, high))
}

/// Draws `per_class` rows from each cluster with a seeded generator.
pub fn synthetic_rows(
    clusters: &[SyntheticCluster],
    per_class: usize,
    seed: u64,
) -> Result<Vec<TrainingRow>, TrainError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(clusters.len() * per_class);

    for cluster in clusters {
        let pressure = normal(cluster.label, "pressure", cluster.pressure)?;
        let precipitation = uniform(cluster.label, cluster.precipitation)?;
        let humidity = normal(cluster.label, "humidity", cluster.humidity)?;
        let trend = normal(cluster.label, "pressure_trend", cluster.pressure_trend)?;

        for _ in 0..per_class {
            rows.push(TrainingRow {
                features: FeatureVector {
                    pressure: pressure.sample(&mut rng),
                    precipitation: precipitation.sample(&mut rng),
                    humidity: humidity.sample(&mut rng),
                    pressure_trend: trend.sample(&mut rng),
                },
                label: cluster.label,
            });
        }
    }

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Blending and split
// ---------------------------------------------------------------------------

/// Concatenates real and synthetic rows, replacing missing values with 0.0.
pub fn blend(real: Vec<TrainingRow>, synthetic: Vec<TrainingRow>) -> Vec<TrainingRow> {
    real.into_iter()
        .chain(synthetic)
        .map(|row| {
            let [pressure, precipitation, humidity, pressure_trend] = row.features.to_array();
            TrainingRow {
                features: FeatureVector {
                    pressure,
                    precipitation,
                    humidity,
                    pressure_trend,
                },
                label: row.label,
            }
        })
        .collect()
}

/// Shuffles with `seed` and splits off `ceil(n * test_fraction)` rows for
/// evaluation. Returns `(train, test)`.
pub fn train_test_split(
    mut rows: Vec<TrainingRow>,
    test_fraction: f64,
    seed: u64,
) -> (Vec<TrainingRow>, Vec<TrainingRow>) {
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut n_test = (rows.len() as f64 * fraction).ceil() as usize;
    // Never leave the training side empty.
    if n_test >= rows.len() {
        n_test = rows.len().saturating_sub(1);
    }

    let test = rows.split_off(rows.len() - n_test);
    (rows, test)
}

/// Number of rows per label, in [`RiskLabel::ALL`] order.
pub fn class_counts(rows: &[TrainingRow]) -> [usize; RiskLabel::COUNT] {
    let mut counts = [0; RiskLabel::COUNT];
    for row in rows {
        counts[row.label.index()] += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pressure: f64, precipitation: f64, label: RiskLabel) -> TrainingRow {
        TrainingRow {
            features: FeatureVector {
                pressure,
                precipitation,
                humidity: 80.0,
                pressure_trend: 0.0,
            },
            label,
        }
    }

    #[test]
    fn test_synthetic_rows_are_class_balanced() {
        let rows = synthetic_rows(&SYNTHETIC_CLUSTERS, 50, 42).unwrap();
        assert_eq!(rows.len(), 150);
        assert_eq!(class_counts(&rows), [50, 50, 50]);
    }

    #[test]
    fn test_synthetic_rows_are_reproducible_for_a_seed() {
        let a = synthetic_rows(&SYNTHETIC_CLUSTERS, 10, 7).unwrap();
        let b = synthetic_rows(&SYNTHETIC_CLUSTERS, 10, 7).unwrap();
        let c = synthetic_rows(&SYNTHETIC_CLUSTERS, 10, 8).unwrap();
        assert_eq!(a, b, "same seed should give the same rows");
        assert_ne!(a, c, "different seed should give different rows");
    }

    #[test]
    fn test_synthetic_precipitation_stays_in_cluster_range() {
        let rows = synthetic_rows(&SYNTHETIC_CLUSTERS, 200, 1).unwrap();
        for r in &rows {
            let cluster = &SYNTHETIC_CLUSTERS[r.label.index()];
            let (low, high) = cluster.precipitation;
            assert!(
                r.features.precipitation >= low && r.features.precipitation < high,
                "{} precipitation {} outside [{}, {})",
                r.label,
                r.features.precipitation,
                low,
                high
            );
        }
    }

    #[test]
    fn test_warning_cluster_is_wetter_and_lower_than_normal() {
        let rows = synthetic_rows(&SYNTHETIC_CLUSTERS, 100, 3).unwrap();
        let mean = |label: RiskLabel, f: fn(&FeatureVector) -> f64| {
            let vals: Vec<f64> = rows
                .iter()
                .filter(|r| r.label == label)
                .map(|r| f(&r.features))
                .collect();
            vals.iter().sum::<f64>() / vals.len() as f64
        };
        assert!(mean(RiskLabel::Warning, |v| v.pressure) < mean(RiskLabel::Normal, |v| v.pressure));
        assert!(mean(RiskLabel::Warning, |v| v.humidity) > mean(RiskLabel::Normal, |v| v.humidity));
    }

    #[test]
    fn test_invalid_cluster_spread_is_rejected() {
        let mut clusters = SYNTHETIC_CLUSTERS;
        clusters[0].pressure = (1010.0, -1.0);
        let result = synthetic_rows(&clusters, 5, 42);
        assert!(matches!(result, Err(TrainError::InvalidDistribution(_))));
    }

    #[test]
    fn test_empty_precipitation_range_is_rejected() {
        let mut clusters = SYNTHETIC_CLUSTERS;
        clusters[1].precipitation = (0.9, 0.4);
        assert!(synthetic_rows(&clusters, 5, 42).is_err());
    }

    #[test]
    fn test_blend_keeps_real_rows_first_and_zeroes_missing_values() {
        let real = vec![row(f64::NAN, 0.5, RiskLabel::Watch)];
        let synthetic = vec![row(1010.0, 0.1, RiskLabel::Normal)];
        let blended = blend(real, synthetic);
        assert_eq!(blended.len(), 2);
        assert_eq!(blended[0].features.pressure, 0.0);
        assert_eq!(blended[0].label, RiskLabel::Watch);
        assert_eq!(blended[1].features.pressure, 1010.0);
    }

    #[test]
    fn test_split_holds_out_twenty_percent() {
        let rows: Vec<_> = (0..100)
            .map(|i| row(1000.0 + i as f64, 0.0, RiskLabel::Normal))
            .collect();
        let (train, test) = train_test_split(rows, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
    }

    #[test]
    fn test_split_rounds_holdout_up() {
        let rows: Vec<_> = (0..11)
            .map(|i| row(1000.0 + i as f64, 0.0, RiskLabel::Normal))
            .collect();
        let (train, test) = train_test_split(rows, 0.2, 42);
        assert_eq!(test.len(), 3, "ceil(11 * 0.2) = 3");
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_never_empties_training_side() {
        let rows = vec![row(1000.0, 0.0, RiskLabel::Normal)];
        let (train, test) = train_test_split(rows, 0.2, 42);
        assert_eq!(train.len(), 1);
        assert!(test.is_empty());
    }

    #[test]
    fn test_split_is_deterministic_for_a_seed() {
        let rows: Vec<_> = (0..30)
            .map(|i| row(1000.0 + i as f64, 0.0, RiskLabel::Normal))
            .collect();
        let (a_train, _) = train_test_split(rows.clone(), 0.2, 9);
        let (b_train, _) = train_test_split(rows, 0.2, 9);
        assert_eq!(a_train, b_train);
    }
}
