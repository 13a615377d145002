//! Posts the canned demo scenarios in rotation until interrupted.
//!
//! Usage: flood_monitor_demo [interval_seconds]

use flood_risk_monitor::alert::{AlertSink, HttpAlertSink};
use flood_risk_monitor::config::Config;
use flood_risk_monitor::demo::{DEFAULT_DEMO_INTERVAL, DEMO_SCENARIOS, run_demo_sequence};
use flood_risk_monitor::logging::init_logging;
use flood_risk_monitor::monitor::install_interrupt_handler;
use std::time::Duration;
use tracing::{error, info};

fn parse_interval(arg: Option<String>) -> Result<Duration, String> {
    match arg {
        None => Ok(DEFAULT_DEMO_INTERVAL),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("Usage: flood_monitor_demo [interval_seconds] (got '{}')", s)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(&config.logging)?;

    let interval = parse_interval(std::env::args().nth(1))?;
    let Some(base_url) = config.alert_base_url.as_deref() else {
        error!("CONVEX_URL not set in environment or config file");
        return Err("alert sink base URL is required".into());
    };
    let sink = HttpAlertSink::new(base_url, config.alert_timeout)?;

    info!("DEMO MODE - {} Flood Detection System", config.location.name);
    info!("Location: {}", config.location.address);
    info!("Alert endpoint: {}", sink.endpoint());
    info!("Alert interval: {} seconds", interval.as_secs());
    info!("Demo scenarios: {}", DEMO_SCENARIOS.len());

    let mut ticker = install_interrupt_handler()?;
    run_demo_sequence(&sink, &config.location, interval, &mut ticker);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_defaults_to_thirty_seconds() {
        assert_eq!(parse_interval(None), Ok(Duration::from_secs(30)));
    }

    #[test]
    fn test_interval_must_be_positive_integer() {
        assert_eq!(parse_interval(Some("5".to_string())), Ok(Duration::from_secs(5)));
        assert!(parse_interval(Some("0".to_string())).is_err());
        assert!(parse_interval(Some("soon".to_string())).is_err());
    }
}
