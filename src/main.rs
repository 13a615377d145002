//! Flood Risk Monitor - Main Entry Point
//!
//! Usage: flood_risk_monitor [interval_minutes]

use flood_risk_monitor::alert::HttpAlertSink;
use flood_risk_monitor::classifier::RiskClassifier;
use flood_risk_monitor::config::Config;
use flood_risk_monitor::ingest::open_meteo::OpenMeteoClient;
use flood_risk_monitor::logging::{DataSource, init_logging};
use flood_risk_monitor::monitor::{MonitorLoop, install_interrupt_handler};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    config.apply_interval_arg(std::env::args().nth(1).as_deref())?;
    init_logging(&config.logging)?;

    info!(
        "=== {} Flood Monitoring System v{} ===",
        config.location.name,
        env!("CARGO_PKG_VERSION")
    );
    info!(source = %DataSource::Model, "Training model...");

    let source = OpenMeteoClient::new(config.location.clone(), config.weather_timeout)?;
    let classifier = match RiskClassifier::train_from_source(&source, &config.training) {
        Ok(model) => model,
        Err(e) => {
            error!(source = %DataSource::Model, "Model training failed: {}", e);
            return Err(e.into());
        }
    };

    let sink = match &config.alert_base_url {
        Some(url) => Some(HttpAlertSink::new(url, config.alert_timeout)?),
        None => None,
    };

    info!("Model ready");
    info!(
        "Monitoring: {} ({}, {})",
        config.location.name, config.location.latitude, config.location.longitude
    );
    info!("Check interval: {} minutes", config.poll_interval.as_secs() / 60);
    info!(
        "Alert endpoint: {}",
        config.alert_endpoint().unwrap_or_else(|| "NOT SET".to_string())
    );
    if let Some(acc) = classifier.holdout_accuracy() {
        info!("Holdout accuracy: {:.2}%", acc * 100.0);
    }

    let mut ticker = install_interrupt_handler()?;
    let mut monitor = MonitorLoop::new(&source, &classifier, sink, config.location.clone())
        .with_interval(config.poll_interval)
        .with_forecast_days(config.forecast_days);

    let summary = monitor.run(&mut ticker);
    info!(
        "Run complete: {} checks, {} failed fetches, {} alerts triggered, {} delivered",
        summary.cycles, summary.fetch_failures, summary.alerts_triggered, summary.alerts_delivered
    );

    Ok(())
}
