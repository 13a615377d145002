//! Canned alerts for dashboard demonstrations.
//!
//! These bypass the weather source and the model entirely and post fixed
//! scenarios straight to the alert sink.

use crate::alert::payload::{DEMO_SOURCE, DemoTrigger, DemoWeather, LocationInfo, TriggerData};
use crate::alert::{AlertPayload, AlertSink};
use crate::location::MonitoredLocation;
use crate::logging::{DataSource, log_sink_failure};
use crate::model::RiskLabel;
use crate::monitor::{Ticker, Wake};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

/// Default pause between alerts in the repeating demo.
pub const DEFAULT_DEMO_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoScenario {
    pub label: RiskLabel,
    pub description: &'static str,
    pub pressure: f64,
    pub precipitation: f64,
    pub humidity: f64,
    pub trend: f64,
    /// District shown on the dashboard, if any.
    pub district: Option<&'static str>,
}

pub const DEMO_SCENARIOS: [DemoScenario; 3] = [
    DemoScenario {
        label: RiskLabel::Watch,
        description: "Moderate rainfall detected in northern districts. Water levels rising near Lyari River. Confidence: 87.3%",
        pressure: 1003.2,
        precipitation: 0.65,
        humidity: 88.5,
        trend: -2.3,
        district: Some("Karachi North - Lyari"),
    },
    DemoScenario {
        label: RiskLabel::Warning,
        description: "Heavy rainfall exceeding 1.2 inches detected. Severe flooding imminent in low-lying areas. Confidence: 94.1%",
        pressure: 997.8,
        precipitation: 1.35,
        humidity: 96.2,
        trend: -5.7,
        district: Some("Karachi Central - Saddar"),
    },
    DemoScenario {
        label: RiskLabel::Warning,
        description: "Critical pressure drop with sustained heavy rainfall. Infrastructure failure risk high. Confidence: 91.8%",
        pressure: 995.1,
        precipitation: 1.8,
        humidity: 97.5,
        trend: -8.2,
        district: Some("Karachi South - Clifton"),
    },
];

/// One-shot alert types, keyed by the argument the trigger binary accepts.
pub const TRIGGER_SCENARIOS: [(&str, DemoScenario); 2] = [
    (
        "1",
        DemoScenario {
            district: None,
            ..DEMO_SCENARIOS[0]
        },
    ),
    (
        "2",
        DemoScenario {
            description: "Heavy rainfall exceeding 1.2 inches detected. Severe flooding imminent. Confidence: 94.1%",
            district: None,
            ..DEMO_SCENARIOS[1]
        },
    ),
];

pub const DEFAULT_TRIGGER_TYPE: &str = "2";

/// Looks up a one-shot scenario by its type argument.
pub fn trigger_scenario(alert_type: &str) -> Option<&'static DemoScenario> {
    TRIGGER_SCENARIOS
        .iter()
        .find(|(key, _)| *key == alert_type.trim())
        .map(|(_, scenario)| scenario)
}

/// Builds the payload for a scenario. `timestamp` is included when given.
pub fn demo_payload(
    scenario: &DemoScenario,
    location: &MonitoredLocation,
    timestamp: Option<DateTime<Utc>>,
) -> AlertPayload {
    AlertPayload {
        title: location.alert_title(scenario.label.status_text()),
        description: scenario.description.to_string(),
        incident_type: "flood",
        severity: scenario.label.severity(),
        trigger_data: TriggerData::Demo(DemoTrigger {
            source: DEMO_SOURCE,
            demo_mode: true,
            timestamp: timestamp.map(|t| t.to_rfc3339()),
            weather: DemoWeather {
                pressure: scenario.pressure,
                precipitation: scenario.precipitation,
                humidity: scenario.humidity,
                trend: scenario.trend,
                location: scenario.district.map(String::from),
            },
        }),
        location: LocationInfo::from(location),
    }
}

/// Sends one scenario, logging the outcome. Returns whether it was accepted.
pub fn send_demo_alert<S: AlertSink>(sink: &S, payload: &AlertPayload) -> bool {
    match sink.deliver(payload) {
        Ok(receipt) => {
            info!(
                source = %DataSource::AlertSink,
                severity = payload.severity.unwrap_or("-"),
                status = receipt.status,
                "Alert sent: {}",
                payload.title
            );
            true
        }
        Err(e) => {
            log_sink_failure(sink.endpoint(), &e);
            false
        }
    }
}

/// Cycles through [`DEMO_SCENARIOS`] until the ticker reports shutdown.
/// Returns the number of alerts attempted.
pub fn run_demo_sequence<S: AlertSink, T: Ticker>(
    sink: &S,
    location: &MonitoredLocation,
    interval: Duration,
    ticker: &mut T,
) -> usize {
    let mut sent = 0;
    loop {
        if ticker.shutdown_requested() {
            info!(source = %DataSource::Monitor, "Demo stopped. Total alerts sent: {}", sent);
            return sent;
        }
        let scenario = &DEMO_SCENARIOS[sent % DEMO_SCENARIOS.len()];
        info!(source = %DataSource::Monitor, "DEMO ALERT #{}", sent + 1);
        send_demo_alert(sink, &demo_payload(scenario, location, None));
        sent += 1;

        info!(source = %DataSource::Monitor, "Next alert in {} seconds", interval.as_secs());
        if ticker.sleep(interval) == Wake::Shutdown {
            info!(source = %DataSource::Monitor, "Demo stopped. Total alerts sent: {}", sent);
            return sent;
        }
    }
}
