//! Core data types for the flood risk monitoring service.
//!
//! This module defines the shared domain model imported by all other modules:
//! the raw hourly series returned by the weather source, the single sample the
//! monitor evaluates, the four-feature vector fed to the classifier, and the
//! ordinal risk label with its fixed display mapping.
//!
//! It contains no I/O. Error types live next to the code that produces them.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::fmt;

/// Number of features in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 4;

/// Column order used everywhere a feature vector is flattened.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["pressure", "precipitation", "humidity", "pressure_trend"];

// ---------------------------------------------------------------------------
// Hourly series
// ---------------------------------------------------------------------------

/// An hourly-aligned time series for one geographic point.
///
/// The three value arrays are indexed by hour and always have the same length
/// as `times`. Readings the upstream API reported as null are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySeries {
    /// First timestamp in the series (inclusive).
    pub start: DateTime<Utc>,
    /// One step past the last timestamp (exclusive).
    pub end: DateTime<Utc>,
    /// Spacing between consecutive points, in seconds.
    pub step_secs: i64,
    pub times: Vec<DateTime<Utc>>,
    /// Surface pressure, hPa.
    pub pressure: Vec<f64>,
    /// Precipitation, inch/hr.
    pub precipitation: Vec<f64>,
    /// Relative humidity, %.
    pub humidity: Vec<f64>,
}

impl HourlySeries {
    /// Builds a series from parallel arrays, deriving the interval metadata
    /// from the timestamps.
    ///
    /// Returns `None` if the arrays differ in length or are empty.
    pub fn from_parts(
        times: Vec<DateTime<Utc>>,
        pressure: Vec<f64>,
        precipitation: Vec<f64>,
        humidity: Vec<f64>,
    ) -> Option<Self> {
        let n = times.len();
        if n == 0 || pressure.len() != n || precipitation.len() != n || humidity.len() != n {
            return None;
        }

        let step_secs = if n >= 2 {
            (times[1] - times[0]).num_seconds()
        } else {
            3600
        };
        let start = times[0];
        let end = times[n - 1] + chrono::Duration::seconds(step_secs);

        Some(Self {
            start,
            end,
            step_secs,
            times,
            pressure,
            precipitation,
            humidity,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Samples and features
// ---------------------------------------------------------------------------

/// One hourly observation selected from a fetched series.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    pub pressure: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub timestamp_utc: DateTime<Utc>,
    pub timestamp_local: DateTime<FixedOffset>,
    /// Offset of this sample within the fetched series.
    pub source_index: usize,
}

impl WeatherSample {
    /// Key used to recognise the same upstream observation across polls:
    /// the UTC hour plus the exact pressure reading.
    pub fn identity_key(&self) -> String {
        format!("{}_{}", self.timestamp_utc.to_rfc3339(), self.pressure)
    }

    /// True if any reading was reported missing upstream.
    pub fn has_missing_readings(&self) -> bool {
        !(self.pressure.is_finite() && self.precipitation.is_finite() && self.humidity.is_finite())
    }
}

/// The four features used for classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub pressure: f64,
    pub precipitation: f64,
    pub humidity: f64,
    /// pressure[t+3h] - pressure[t], or 0.0 when t+3h is outside the window.
    pub pressure_trend: f64,
}

impl FeatureVector {
    /// Flattens into [`FEATURE_NAMES`] order, replacing missing values with 0.0.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            finite_or_zero(self.pressure),
            finite_or_zero(self.precipitation),
            finite_or_zero(self.humidity),
            finite_or_zero(self.pressure_trend),
        ]
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Risk levels
// ---------------------------------------------------------------------------

/// Ordinal flood risk level. `Warning` is the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLabel {
    Normal = 0,
    Watch = 1,
    Warning = 2,
}

impl RiskLabel {
    pub const COUNT: usize = 3;
    pub const ALL: [RiskLabel; Self::COUNT] =
        [RiskLabel::Normal, RiskLabel::Watch, RiskLabel::Warning];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn status_text(self) -> &'static str {
        match self {
            RiskLabel::Normal => "NORMAL",
            RiskLabel::Watch => "FLOOD WATCH",
            RiskLabel::Warning => "EMERGENCY WARNING",
        }
    }

    pub fn color_tag(self) -> &'static str {
        match self {
            RiskLabel::Normal => "GREEN",
            RiskLabel::Watch => "YELLOW",
            RiskLabel::Warning => "RED",
        }
    }

    /// Incident severity sent to the alert sink. `Normal` never reaches it.
    pub fn severity(self) -> Option<&'static str> {
        match self {
            RiskLabel::Normal => None,
            RiskLabel::Watch => Some("high"),
            RiskLabel::Warning => Some("critical"),
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status_text())
    }
}

/// Output of a single classification call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: RiskLabel,
    pub status_text: &'static str,
    pub color_tag: &'static str,
    /// Probability mass assigned to `label`, scaled to 0-100.
    pub confidence: f64,
    /// Per-label probabilities in [`RiskLabel::ALL`] order.
    pub probabilities: [f64; RiskLabel::COUNT],
}

impl Prediction {
    /// Builds a prediction from a class probability distribution.
    ///
    /// The label is the argmax; ties resolve to the less severe label.
    pub fn from_probabilities(probabilities: [f64; RiskLabel::COUNT]) -> Self {
        let mut best = 0;
        for (i, p) in probabilities.iter().enumerate() {
            if *p > probabilities[best] {
                best = i;
            }
        }
        let label = RiskLabel::from_index(best).unwrap_or(RiskLabel::Normal);
        let confidence = (probabilities[best] * 100.0).clamp(0.0, 100.0);

        Self {
            label,
            status_text: label.status_text(),
            color_tag: label.color_tag(),
            confidence: if confidence.is_finite() { confidence } else { 0.0 },
            probabilities,
        }
    }
}

/// One labeled row used only to fit the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingRow {
    pub features: FeatureVector,
    pub label: RiskLabel,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
