//! JSON bodies posted to the incident endpoint.

use crate::location::MonitoredLocation;
use crate::model::{FeatureVector, Prediction, WeatherSample};
use serde::Serialize;

/// `trigger_data.source` for alerts raised by the live model.
pub const MODEL_SOURCE: &str = "ml_model";
/// `trigger_data.source` for canned demo alerts.
pub const DEMO_SOURCE: &str = "ml_model_demo";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub title: String,
    pub description: String,
    pub incident_type: &'static str,
    /// Omitted for NORMAL, which never reaches the sink.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<&'static str>,
    pub trigger_data: TriggerData,
    pub location: LocationInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TriggerData {
    Model(ModelTrigger),
    Demo(DemoTrigger),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTrigger {
    pub source: &'static str,
    pub prediction_level: usize,
    pub confidence: f64,
    pub weather: ObservedWeather,
}

/// The reading that produced the prediction. Missing readings serialize as
/// `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedWeather {
    pub pressure: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub trend: f64,
    pub data_hour_utc: String,
    pub data_hour_pk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoTrigger {
    pub source: &'static str,
    pub demo_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub weather: DemoWeather,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemoWeather {
    pub pressure: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub trend: f64,
    /// District name shown on the dashboard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInfo {
    pub lat: f64,
    pub lon: f64,
    pub address: String,
}

impl From<&MonitoredLocation> for LocationInfo {
    fn from(location: &MonitoredLocation) -> Self {
        Self {
            lat: location.latitude,
            lon: location.longitude,
            address: location.address.clone(),
        }
    }
}

impl AlertPayload {
    /// Builds the incident body for a live model prediction.
    pub fn from_prediction(
        location: &MonitoredLocation,
        sample: &WeatherSample,
        features: &FeatureVector,
        prediction: &Prediction,
    ) -> Self {
        Self {
            title: location.alert_title(prediction.status_text),
            description: format!(
                "Automated flood detection system alert. Confidence: {:.1}%",
                prediction.confidence
            ),
            incident_type: "flood",
            severity: prediction.label.severity(),
            trigger_data: TriggerData::Model(ModelTrigger {
                source: MODEL_SOURCE,
                prediction_level: prediction.label.index(),
                confidence: prediction.confidence,
                weather: ObservedWeather {
                    pressure: sample.pressure,
                    precipitation: sample.precipitation,
                    humidity: sample.humidity,
                    trend: features.pressure_trend,
                    data_hour_utc: sample.timestamp_utc.format(TIMESTAMP_FORMAT).to_string(),
                    data_hour_pk: sample.timestamp_local.format(TIMESTAMP_FORMAT).to_string(),
                },
            }),
            location: LocationInfo::from(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::karachi;
    use crate::model::RiskLabel;
    use chrono::{FixedOffset, TimeZone, Utc};
    use serde_json::json;

    fn warning_sample() -> (WeatherSample, FeatureVector) {
        let at = Utc.with_ymd_and_hms(2024, 8, 1, 6, 0, 0).unwrap();
        let sample = WeatherSample {
            pressure: 997.8,
            precipitation: 1.35,
            humidity: 96.2,
            timestamp_utc: at,
            timestamp_local: at.with_timezone(&FixedOffset::east_opt(5 * 3600).unwrap()),
            source_index: 6,
        };
        let features = FeatureVector {
            pressure: 997.8,
            precipitation: 1.35,
            humidity: 96.2,
            pressure_trend: -5.7,
        };
        (sample, features)
    }

    #[test]
    fn test_model_payload_shape() {
        let (sample, features) = warning_sample();
        let prediction = Prediction::from_probabilities([0.02, 0.04, 0.94]);
        let payload = AlertPayload::from_prediction(&karachi(), &sample, &features, &prediction);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["title"], "Karachi Flood Alert: EMERGENCY WARNING");
        assert_eq!(
            value["description"],
            "Automated flood detection system alert. Confidence: 94.0%"
        );
        assert_eq!(value["incident_type"], "flood");
        assert_eq!(value["severity"], "critical");
        assert_eq!(value["trigger_data"]["source"], "ml_model");
        assert_eq!(value["trigger_data"]["prediction_level"], 2);
        assert_eq!(value["trigger_data"]["weather"]["trend"], -5.7);
        assert_eq!(value["trigger_data"]["weather"]["data_hour_utc"], "2024-08-01 06:00:00+00:00");
        assert_eq!(value["trigger_data"]["weather"]["data_hour_pk"], "2024-08-01 11:00:00+05:00");
        assert_eq!(
            value["location"],
            json!({"lat": 24.8608, "lon": 67.0104, "address": "Karachi, Pakistan"})
        );
    }

    #[test]
    fn test_watch_maps_to_high_severity() {
        let (sample, features) = warning_sample();
        let prediction = Prediction::from_probabilities([0.1, 0.8, 0.1]);
        assert_eq!(prediction.label, RiskLabel::Watch);
        let payload = AlertPayload::from_prediction(&karachi(), &sample, &features, &prediction);
        assert_eq!(payload.severity, Some("high"));
        assert_eq!(payload.title, "Karachi Flood Alert: FLOOD WATCH");
    }

    #[test]
    fn test_normal_payload_omits_severity() {
        let (sample, features) = warning_sample();
        let prediction = Prediction::from_probabilities([0.9, 0.05, 0.05]);
        let payload = AlertPayload::from_prediction(&karachi(), &sample, &features, &prediction);
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value.get("severity").is_none());
    }

    #[test]
    fn test_missing_reading_serializes_as_null() {
        let (mut sample, features) = warning_sample();
        sample.humidity = f64::NAN;
        let prediction = Prediction::from_probabilities([0.0, 0.0, 1.0]);
        let payload = AlertPayload::from_prediction(&karachi(), &sample, &features, &prediction);
        let value = serde_json::to_value(&payload).unwrap();
        assert!(value["trigger_data"]["weather"]["humidity"].is_null());
    }

    #[test]
    fn test_demo_trigger_omits_absent_optionals() {
        let trigger = TriggerData::Demo(DemoTrigger {
            source: DEMO_SOURCE,
            demo_mode: true,
            timestamp: None,
            weather: DemoWeather {
                pressure: 1003.2,
                precipitation: 0.65,
                humidity: 88.5,
                trend: -2.3,
                location: None,
            },
        });
        let value = serde_json::to_value(&trigger).unwrap();
        assert_eq!(
            value,
            json!({
                "source": "ml_model_demo",
                "demo_mode": true,
                "weather": {
                    "pressure": 1003.2,
                    "precipitation": 0.65,
                    "humidity": 88.5,
                    "trend": -2.3
                }
            })
        );
    }
}
