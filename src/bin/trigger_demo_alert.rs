//! Sends a single canned flood alert to the configured sink.
//!
//! Usage: trigger_demo_alert [1|2]
//!   1 - FLOOD WATCH (high severity)
//!   2 - EMERGENCY WARNING (critical severity, default)

use chrono::Utc;
use flood_risk_monitor::alert::{AlertSink, HttpAlertSink};
use flood_risk_monitor::config::Config;
use flood_risk_monitor::demo::{
    DEFAULT_TRIGGER_TYPE, demo_payload, send_demo_alert, trigger_scenario,
};
use flood_risk_monitor::logging::init_logging;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(&config.logging)?;

    let Some(base_url) = config.alert_base_url.as_deref() else {
        error!("CONVEX_URL not set in environment or config file");
        return Err("alert sink base URL is required".into());
    };

    let alert_type = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_TRIGGER_TYPE.to_string());
    let Some(scenario) = trigger_scenario(&alert_type) else {
        error!(
            "Invalid alert type: {}. Available types: 1 (FLOOD WATCH), 2 (EMERGENCY WARNING)",
            alert_type
        );
        return Err(format!("invalid alert type '{}'", alert_type).into());
    };

    let sink = HttpAlertSink::new(base_url, config.alert_timeout)?;
    let payload = demo_payload(scenario, &config.location, Some(Utc::now()));

    info!("Triggering demo alert");
    info!("Title: {}", payload.title);
    info!("Severity: {}", payload.severity.unwrap_or("-").to_uppercase());
    info!("Endpoint: {}", sink.endpoint());

    if send_demo_alert(&sink, &payload) {
        Ok(())
    } else {
        Err("demo alert was not accepted".into())
    }
}
