//! Weather data acquisition.
//!
//! The monitor only depends on the [`WeatherSource`] trait; the Open-Meteo
//! client is the production implementation and tests substitute canned
//! series.

pub mod open_meteo;

use crate::model::HourlySeries;
use thiserror::Error;

/// Which slice of time a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryWindow {
    /// Hourly readings for the last `past_days` days, no forecast hours.
    History { past_days: u32 },
    /// Hourly forecast readings for the next `forecast_days` days.
    Forecast { forecast_days: u32 },
}

/// Errors that can arise when fetching or decoding weather data.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Non-2xx HTTP response from the weather API.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// Connection failure, timeout, or body read failure.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    Parse(String),
    /// The response decoded but held no hourly points.
    #[error("No data available: {0}")]
    NoData(String),
    /// The hourly arrays were inconsistent with each other.
    #[error("Malformed series: {0}")]
    Malformed(String),
}

/// Supplies an hourly {pressure, precipitation, humidity} series for the
/// monitored location.
pub trait WeatherSource {
    fn fetch(&self, window: QueryWindow) -> Result<HourlySeries, WeatherError>;
}

impl<T: WeatherSource + ?Sized> WeatherSource for &T {
    fn fetch(&self, window: QueryWindow) -> Result<HourlySeries, WeatherError> {
        (**self).fetch(window)
    }
}
