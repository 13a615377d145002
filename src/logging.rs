/// Structured logging for the flood risk monitor
///
/// Installs a `tracing` subscriber with an environment-overridable level,
/// optional file output for daemon operation, and optional timestamps.
/// Events carry a `source` field naming the subsystem they came from, and
/// upstream failures are classified before they are logged so that an
/// expected outage does not look like a service fault.

use crate::alert::sink::SinkError;
use crate::ingest::WeatherError;
use serde::Deserialize;
use std::fmt;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    OpenMeteo,
    AlertSink,
    Model,
    Monitor,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::OpenMeteo => write!(f, "OPEN-METEO"),
            DataSource::AlertSink => write!(f, "ALERT-SINK"),
            DataSource::Model => write!(f, "MODEL"),
            DataSource::Monitor => write!(f, "MONITOR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - upstream is rate limiting or briefly unavailable
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Append log lines to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Whether to prefix each line with a timestamp
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            timestamps: true,
        }
    }
}

/// Builds the level filter: `RUST_LOG` if set and valid, else `level`,
/// else `info`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// Fails only if the log file cannot be opened. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<()> {
    let (writer, ansi) = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);

    let result = if config.timestamps {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };
    if let Err(e) = result {
        debug!("logging already initialised: {}", e);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a weather fetch failure
pub fn classify_weather_failure(err: &WeatherError) -> FailureType {
    match err {
        // Rate limiting and gateway hiccups clear on their own
        WeatherError::Http(429) | WeatherError::Http(502..=504) => FailureType::Expected,
        WeatherError::Http(_) => FailureType::Unexpected,
        WeatherError::Transport(e) if e.is_timeout() => FailureType::Unexpected,
        WeatherError::Transport(_) => FailureType::Unknown,
        // Parse errors suggest API changes or bugs
        WeatherError::Parse(_) | WeatherError::Malformed(_) => FailureType::Unexpected,
        WeatherError::NoData(_) => FailureType::Unknown,
    }
}

/// Classify an alert delivery failure
pub fn classify_sink_failure(err: &SinkError) -> FailureType {
    match err {
        SinkError::Http { status, .. } if *status >= 500 => FailureType::Unknown,
        // A 4xx means the payload or endpoint is wrong
        SinkError::Http { .. } => FailureType::Unexpected,
        SinkError::Transport(e) if e.is_timeout() => FailureType::Unexpected,
        SinkError::Transport(_) => FailureType::Unknown,
        SinkError::Client(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn emit(source: DataSource, failure_type: &FailureType, message: &str) {
    match failure_type {
        FailureType::Expected => debug!(source = %source, "{}", message),
        FailureType::Unexpected => error!(source = %source, "{}", message),
        FailureType::Unknown => warn!(source = %source, "{}", message),
    }
}

/// Log a weather fetch failure with automatic classification
pub fn log_weather_failure(operation: &str, err: &WeatherError) {
    let failure_type = classify_weather_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);
    emit(DataSource::OpenMeteo, &failure_type, &message);
}

/// Log an alert delivery failure with automatic classification
pub fn log_sink_failure(endpoint: &str, err: &SinkError) {
    let failure_type = classify_sink_failure(err);
    let message = format!("POST {} failed [{}]: {}", endpoint, failure_type, err);
    emit(DataSource::AlertSink, &failure_type, &message);
}
