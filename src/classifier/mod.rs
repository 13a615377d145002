//! Flood risk classifier.
//!
//! Wraps a seeded random forest over the four-feature vector. A model is
//! built once at startup from a blended real and synthetic training set and
//! is read-only afterwards.

pub mod forest;
pub mod tree;

use crate::analysis::labeling::labeled_rows;
use crate::ingest::{QueryWindow, WeatherSource};
use crate::logging::DataSource;
use crate::model::{
    FEATURE_COUNT, FeatureVector, HourlySeries, Prediction, RiskLabel, TrainingRow,
};
use crate::training::{
    SYNTHETIC_CLUSTERS, TrainError, TrainingConfig, blend, class_counts, synthetic_rows,
    train_test_split,
};
use forest::{ClassWeight, RandomForest};
use tracing::{debug, info};

/// Features examined at each split: floor(sqrt(4)).
pub const MAX_FEATURES: usize = 2;

/// Anything that maps a feature vector to a risk prediction.
pub trait Classify {
    fn classify(&self, features: &FeatureVector) -> Prediction;
}

impl<T: Classify + ?Sized> Classify for &T {
    fn classify(&self, features: &FeatureVector) -> Prediction {
        (**self).classify(features)
    }
}

/// What happened during a fit, for the startup log.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    /// Rows per label in the full blended set.
    pub class_counts: [usize; RiskLabel::COUNT],
    /// Holdout accuracy in 0-1, `None` when nothing was held out.
    pub holdout_accuracy: Option<f64>,
}

/// The trained flood risk model.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    forest: RandomForest,
    summary: TrainingSummary,
}

impl RiskClassifier {
    /// Fits on an already-assembled training set.
    pub fn train(rows: Vec<TrainingRow>, config: &TrainingConfig) -> Result<Self, TrainError> {
        if rows.is_empty() {
            return Err(TrainError::EmptyDataset);
        }

        let counts = class_counts(&rows);
        let (train, test) = train_test_split(rows, config.test_fraction, config.seed);

        let (x_train, y_train) = to_matrix(&train);
        let mut forest = RandomForest::new(config.n_estimators, RiskLabel::COUNT)
            .with_max_depth(config.max_depth)
            .with_max_features(MAX_FEATURES)
            .with_class_weight(ClassWeight::Balanced)
            .with_random_state(config.seed);
        forest.fit(&x_train, &y_train);

        let (x_test, y_test) = to_matrix(&test);
        let holdout_accuracy = forest.score(&x_test, &y_test);

        let summary = TrainingSummary {
            train_rows: train.len(),
            test_rows: test.len(),
            class_counts: counts,
            holdout_accuracy,
        };

        debug!(
            normal = counts[0],
            watch = counts[1],
            warning = counts[2],
            "training set class counts"
        );
        match holdout_accuracy {
            Some(acc) => info!(
                source = %DataSource::Model,
                "Model trained. Accuracy: {:.2}%",
                acc * 100.0
            ),
            None => info!(
                source = %DataSource::Model,
                "Model trained. No rows held out for accuracy"
            ),
        }

        Ok(Self { forest, summary })
    }

    /// Labels a historical series by rule, blends in the synthetic clusters
    /// and fits.
    pub fn train_with_history(
        history: &HourlySeries,
        config: &TrainingConfig,
    ) -> Result<Self, TrainError> {
        let real = labeled_rows(history);
        let synthetic =
            synthetic_rows(&SYNTHETIC_CLUSTERS, config.synthetic_per_class, config.seed)?;
        info!(
            source = %DataSource::Model,
            real = real.len(),
            synthetic = synthetic.len(),
            "assembling training set"
        );
        Self::train(blend(real, synthetic), config)
    }

    /// Fetches `history_days` of hourly history and trains on it.
    pub fn train_from_source<W: WeatherSource>(
        source: &W,
        config: &TrainingConfig,
    ) -> Result<Self, TrainError> {
        let history = source.fetch(QueryWindow::History {
            past_days: config.history_days,
        })?;
        Self::train_with_history(&history, config)
    }

    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        let proba = self.forest.predict_proba(&features.to_array());
        let mut probabilities = [0.0; RiskLabel::COUNT];
        for (slot, p) in probabilities.iter_mut().zip(proba) {
            *slot = p;
        }
        Prediction::from_probabilities(probabilities)
    }

    pub fn holdout_accuracy(&self) -> Option<f64> {
        self.summary.holdout_accuracy
    }

    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }
}

impl Classify for RiskClassifier {
    fn classify(&self, features: &FeatureVector) -> Prediction {
        self.predict(features)
    }
}

fn to_matrix(rows: &[TrainingRow]) -> (Vec<[f64; FEATURE_COUNT]>, Vec<usize>) {
    rows.iter().map(|r| (r.features.to_array(), r.label.index())).unzip()
}
