//! Runtime configuration.
//!
//! Values are resolved in layers, later layers winning:
//! built-in defaults, an optional TOML file, environment variables (with
//! `.env` loaded first), and finally the positional interval argument.
//!
//! ```toml
//! [monitor]
//! interval_minutes = 10
//!
//! [alert]
//! base_url = "https://example.convex.site"
//! timeout_secs = 10
//!
//! [weather]
//! timeout_secs = 30
//! forecast_days = 1
//!
//! [training]
//! seed = 42
//! n_estimators = 100
//!
//! [logging]
//! level = "info"
//! ```

use crate::alert::sink::alert_endpoint;
use crate::location::MonitoredLocation;
use crate::logging::LoggingConfig;
use crate::monitor::DEFAULT_POLL_INTERVAL;
use crate::training::TrainingConfig;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "flood_monitor.toml";
/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FLOOD_MONITOR_CONFIG";
/// Environment variable holding the alert sink base URL.
pub const ALERT_URL_ENV: &str = "CONVEX_URL";
/// Environment variable naming a log file.
pub const LOG_FILE_ENV: &str = "FLOOD_MONITOR_LOG_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid poll interval '{0}': expected a positive number of minutes")]
    InvalidInterval(String),
    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}

// ---------------------------------------------------------------------------
// File sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
struct MonitorSection {
    interval_minutes: u64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self { interval_minutes: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
struct AlertSection {
    base_url: Option<String>,
    timeout_secs: u64,
}

impl Default for AlertSection {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
struct WeatherSection {
    timeout_secs: u64,
    forecast_days: u32,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            forecast_days: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    monitor: MonitorSection,
    alert: AlertSection,
    weather: WeatherSection,
    training: TrainingConfig,
    location: MonitoredLocation,
    logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub poll_interval: Duration,
    /// Alert sink base URL. `None` means log-only mode.
    pub alert_base_url: Option<String>,
    pub alert_timeout: Duration,
    pub weather_timeout: Duration,
    pub forecast_days: u32,
    pub training: TrainingConfig,
    pub location: MonitoredLocation,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        let alert = AlertSection::default();
        let weather = WeatherSection::default();
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            alert_base_url: None,
            alert_timeout: Duration::from_secs(alert.timeout_secs),
            weather_timeout: Duration::from_secs(weather.timeout_secs),
            forecast_days: weather.forecast_days,
            training: TrainingConfig::default(),
            location: MonitoredLocation::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    fn from_file_config(file: FileConfig) -> Result<Self, ConfigError> {
        let minutes = file.monitor.interval_minutes;
        Ok(Self {
            poll_interval: interval_from_minutes(minutes, &minutes.to_string())?,
            alert_base_url: normalise_base_url(file.alert.base_url.as_deref()),
            alert_timeout: Duration::from_secs(file.alert.timeout_secs),
            weather_timeout: Duration::from_secs(file.weather.timeout_secs),
            forecast_days: file.weather.forecast_days,
            training: file.training,
            location: file.location,
            logging: file.logging,
        })
    }

    /// Parses and validates a TOML document. Missing keys keep defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        let config = Self::from_file_config(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults, then the config file, then the environment.
    ///
    /// An explicit `FLOOD_MONITOR_CONFIG` path must exist; the default file
    /// is optional.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };

        config.apply_env(env::var(ALERT_URL_ENV).ok(), env::var(LOG_FILE_ENV).ok());
        Ok(config)
    }

    /// Overlays environment-provided values. An empty URL clears the sink.
    pub fn apply_env(&mut self, alert_base_url: Option<String>, log_file: Option<String>) {
        if let Some(url) = alert_base_url {
            self.alert_base_url = normalise_base_url(Some(&url));
        }
        if let Some(path) = log_file.filter(|p| !p.trim().is_empty()) {
            self.logging.log_file = Some(PathBuf::from(path));
        }
    }

    /// Applies the optional positional interval argument (minutes).
    pub fn apply_interval_arg(&mut self, arg: Option<&str>) -> Result<(), ConfigError> {
        if let Some(arg) = arg {
            let minutes = parse_interval_arg(arg)?;
            self.poll_interval = interval_from_minutes(minutes, arg)?;
        }
        Ok(())
    }

    /// Full `/flood-alert` URL, if a sink is configured.
    pub fn alert_endpoint(&self) -> Option<String> {
        self.alert_base_url.as_deref().map(alert_endpoint)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "monitor.interval_minutes must be > 0".to_string(),
            ));
        }
        if self.alert_timeout.is_zero() || self.weather_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("timeouts must be > 0 seconds".to_string()));
        }
        if self.forecast_days == 0 {
            return Err(ConfigError::InvalidValue("weather.forecast_days must be > 0".to_string()));
        }
        let t = &self.training;
        if !(0.0..1.0).contains(&t.test_fraction) {
            return Err(ConfigError::InvalidValue(format!(
                "training.test_fraction must be in [0, 1), got {}",
                t.test_fraction
            )));
        }
        if t.n_estimators == 0 || t.max_depth == 0 || t.synthetic_per_class == 0 {
            return Err(ConfigError::InvalidValue(
                "training.n_estimators, max_depth and synthetic_per_class must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a poll interval in whole minutes. Zero is rejected.
pub fn parse_interval_arg(arg: &str) -> Result<u64, ConfigError> {
    match arg.trim().parse::<u64>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        _ => Err(ConfigError::InvalidInterval(arg.to_string())),
    }
}

/// Minutes to a `Duration`, rejecting values whose seconds overflow `u64`.
fn interval_from_minutes(minutes: u64, raw: &str) -> Result<Duration, ConfigError> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidInterval(raw.to_string()))
}

fn normalise_base_url(url: Option<&str>) -> Option<String> {
    url.map(|u| u.trim().trim_end_matches('/'))
        .filter(|u| !u.is_empty())
        .map(String::from)
}
