//! Duplicate alert suppression.
//!
//! Consecutive polls often return the same upstream hour. An alert fires
//! only when the observation is new and its predicted label is not NORMAL.
//! The last-seen key is recorded on every evaluated poll, whether or not an
//! alert fired, and is never touched by a failed fetch.

use crate::model::{Prediction, RiskLabel, WeatherSample};

/// Identity of the last observation that was evaluated.
///
/// `None` until the first successful poll, which therefore always counts as
/// a change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertState {
    last_key: Option<String>,
}

impl AlertState {
    pub fn last_key(&self) -> Option<&str> {
        self.last_key.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct AlertDecider {
    state: AlertState,
}

impl AlertDecider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Records the sample's identity key and reports whether an alert
    /// should be sent for it.
    pub fn should_alert(&mut self, sample: &WeatherSample, prediction: &Prediction) -> bool {
        let key = sample.identity_key();
        let changed = self.state.last_key.as_deref() != Some(key.as_str());
        self.state.last_key = Some(key);

        changed && prediction.label != RiskLabel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn sample(at: DateTime<Utc>, pressure: f64) -> WeatherSample {
        WeatherSample {
            pressure,
            precipitation: 1.35,
            humidity: 96.2,
            timestamp_utc: at,
            timestamp_local: at.with_timezone(&FixedOffset::east_opt(5 * 3600).unwrap()),
            source_index: 0,
        }
    }

    fn prediction(label: RiskLabel) -> Prediction {
        let mut probabilities = [0.0; RiskLabel::COUNT];
        probabilities[label.index()] = 0.9;
        probabilities[(label.index() + 1) % RiskLabel::COUNT] = 0.1;
        Prediction::from_probabilities(probabilities)
    }

    #[test]
    fn test_first_poll_counts_as_changed() {
        let mut decider = AlertDecider::new();
        assert!(decider.state().last_key().is_none());
        assert!(decider.should_alert(&sample(hour(6), 997.8), &prediction(RiskLabel::Warning)));
    }

    #[test]
    fn test_repeated_observation_alerts_once() {
        let mut decider = AlertDecider::new();
        let s = sample(hour(6), 997.8);
        let fired: Vec<bool> = (0..2)
            .map(|_| decider.should_alert(&s, &prediction(RiskLabel::Warning)))
            .collect();
        assert_eq!(fired, vec![true, false]);
    }

    #[test]
    fn test_distinct_watch_observations_both_alert() {
        let mut decider = AlertDecider::new();
        assert!(decider.should_alert(&sample(hour(6), 1003.2), &prediction(RiskLabel::Watch)));
        assert!(decider.should_alert(&sample(hour(7), 1003.2), &prediction(RiskLabel::Watch)));
    }

    #[test]
    fn test_normal_never_alerts_even_when_changed() {
        let mut decider = AlertDecider::new();
        for h in 0..5 {
            let calm = sample(hour(h), 1010.0 + h as f64);
            assert!(!decider.should_alert(&calm, &prediction(RiskLabel::Normal)));
        }
    }

    #[test]
    fn test_key_is_recorded_even_when_no_alert_fires() {
        let mut decider = AlertDecider::new();
        let s = sample(hour(6), 1003.2);
        assert!(!decider.should_alert(&s, &prediction(RiskLabel::Normal)));
        assert_eq!(decider.state().last_key(), Some(s.identity_key().as_str()));

        // Same observation now classified as a watch: not new, so no alert.
        assert!(!decider.should_alert(&s, &prediction(RiskLabel::Watch)));
    }

    #[test]
    fn test_pressure_change_within_same_hour_is_a_new_observation() {
        let mut decider = AlertDecider::new();
        assert!(decider.should_alert(&sample(hour(6), 997.8), &prediction(RiskLabel::Warning)));
        assert!(decider.should_alert(&sample(hour(6), 997.9), &prediction(RiskLabel::Warning)));
    }

    #[test]
    fn test_returning_to_an_older_observation_alerts_again() {
        let mut decider = AlertDecider::new();
        let a = sample(hour(6), 997.8);
        let b = sample(hour(7), 996.0);
        assert!(decider.should_alert(&a, &prediction(RiskLabel::Warning)));
        assert!(decider.should_alert(&b, &prediction(RiskLabel::Warning)));
        assert!(
            decider.should_alert(&a, &prediction(RiskLabel::Warning)),
            "only the last key is remembered"
        );
    }
}
