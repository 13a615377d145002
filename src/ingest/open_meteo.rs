//! Open-Meteo forecast API client.
//!
//! Retrieves hourly surface pressure, precipitation and relative humidity for
//! the monitored location, either as a historical lookback (for training) or
//! as a short forecast window (for live polling).
//!
//! API documentation: https://open-meteo.com/en/docs

use super::{QueryWindow, WeatherError, WeatherSource};
use crate::location::MonitoredLocation;
use crate::logging::DataSource;
use crate::model::HourlySeries;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly variables requested, in the order the series stores them.
pub const HOURLY_VARIABLES: [&str; 3] =
    ["surface_pressure", "precipitation", "relative_humidity_2m"];

// ============================================================================
// Response structures
// ============================================================================

/// Top-level forecast response (only the fields we use).
#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hourly: Option<HourlyBlock>,
}

/// Hourly arrays, requested with `timeformat=unixtime`.
#[derive(Debug, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<i64>,
    #[serde(default)]
    pub surface_pressure: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
}

/// Error body Open-Meteo returns with a 400 status.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: String,
}

// ============================================================================
// URL construction and parsing
// ============================================================================

/// Builds the forecast URL for `location` and `window`.
pub fn build_forecast_url(
    base_url: &str,
    location: &MonitoredLocation,
    window: QueryWindow,
) -> String {
    let (past_days, forecast_days) = match window {
        QueryWindow::History { past_days } => (past_days, 0),
        QueryWindow::Forecast { forecast_days } => (0, forecast_days),
    };

    let mut url = format!(
        "{}?latitude={}&longitude={}&hourly={}&forecast_days={}\
         &precipitation_unit=inch&timeformat=unixtime&timezone=GMT",
        base_url,
        location.latitude,
        location.longitude,
        HOURLY_VARIABLES.join(","),
        forecast_days,
    );
    if past_days > 0 {
        url.push_str(&format!("&past_days={}", past_days));
    }
    url
}

/// Parses a forecast response body into an [`HourlySeries`].
pub fn parse_forecast_response(body: &str) -> Result<HourlySeries, WeatherError> {
    let response: ForecastResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))?;

    let hourly = response
        .hourly
        .ok_or_else(|| WeatherError::Parse("missing 'hourly' block".to_string()))?;

    if hourly.time.is_empty() {
        return Err(WeatherError::NoData("empty hourly time array".to_string()));
    }

    let n = hourly.time.len();
    for (name, len) in [
        ("surface_pressure", hourly.surface_pressure.len()),
        ("precipitation", hourly.precipitation.len()),
        ("relative_humidity_2m", hourly.relative_humidity_2m.len()),
    ] {
        if len != n {
            return Err(WeatherError::Malformed(format!(
                "{} has {} values for {} timestamps",
                name, len, n
            )));
        }
    }

    let times = hourly
        .time
        .iter()
        .map(|&secs| {
            DateTime::<Utc>::from_timestamp(secs, 0)
                .ok_or_else(|| WeatherError::Parse(format!("timestamp out of range: {}", secs)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let nan_if_null = |values: Vec<Option<f64>>| -> Vec<f64> {
        values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    };

    HourlySeries::from_parts(
        times,
        nan_if_null(hourly.surface_pressure),
        nan_if_null(hourly.precipitation),
        nan_if_null(hourly.relative_humidity_2m),
    )
    .ok_or_else(|| WeatherError::Malformed("inconsistent hourly arrays".to_string()))
}

// ============================================================================
// Client
// ============================================================================

/// Blocking Open-Meteo client bound to one location.
pub struct OpenMeteoClient {
    client: reqwest::blocking::Client,
    base_url: String,
    location: MonitoredLocation,
}

impl OpenMeteoClient {
    pub fn new(location: MonitoredLocation, timeout: Duration) -> Result<Self, WeatherError> {
        Self::with_base_url(OPEN_METEO_BASE_URL, location, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        location: MonitoredLocation,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            location,
        })
    }

    pub fn location(&self) -> &MonitoredLocation {
        &self.location
    }
}

impl WeatherSource for OpenMeteoClient {
    fn fetch(&self, window: QueryWindow) -> Result<HourlySeries, WeatherError> {
        let url = build_forecast_url(&self.base_url, &self.location, window);
        debug!(source = %DataSource::OpenMeteo, %url, "requesting hourly series");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiErrorBody>(&body) {
                debug!(
                    source = %DataSource::OpenMeteo,
                    reason = %err.reason,
                    "API rejected request"
                );
            }
            return Err(WeatherError::Http(status.as_u16()));
        }

        parse_forecast_response(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::karachi;
    use chrono::TimeZone;

    const SAMPLE_BODY: &str = r#"{
        "latitude": 24.875,
        "longitude": 67.0,
        "utc_offset_seconds": 0,
        "timezone": "GMT",
        "hourly_units": {"time": "unixtime", "surface_pressure": "hPa"},
        "hourly": {
            "time": [1722470400, 1722474000, 1722477600],
            "surface_pressure": [1001.2, null, 999.8],
            "precipitation": [0.0, 0.12, 0.4],
            "relative_humidity_2m": [78, 81, 88]
        }
    }"#;

    #[test]
    fn test_history_url_requests_lookback_without_forecast() {
        let url = build_forecast_url(
            OPEN_METEO_BASE_URL,
            &karachi(),
            QueryWindow::History { past_days: 92 },
        );
        assert!(url.starts_with("https://api.open-meteo.com/v1/forecast?"));
        assert!(url.contains("latitude=24.8608"));
        assert!(url.contains("longitude=67.0104"));
        assert!(url.contains("hourly=surface_pressure,precipitation,relative_humidity_2m"));
        assert!(url.contains("past_days=92"));
        assert!(url.contains("forecast_days=0"));
        assert!(url.contains("precipitation_unit=inch"));
    }

    #[test]
    fn test_forecast_url_has_no_lookback() {
        let url = build_forecast_url(
            OPEN_METEO_BASE_URL,
            &karachi(),
            QueryWindow::Forecast { forecast_days: 1 },
        );
        assert!(url.contains("forecast_days=1"));
        assert!(!url.contains("past_days"));
    }

    #[test]
    fn test_parse_response_builds_aligned_series() {
        let series = parse_forecast_response(SAMPLE_BODY).expect("sample body should parse");
        assert_eq!(series.len(), 3);
        assert_eq!(series.start, Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap());
        assert_eq!(series.end, Utc.with_ymd_and_hms(2024, 8, 1, 3, 0, 0).unwrap());
        assert_eq!(series.step_secs, 3600);
        assert_eq!(series.pressure[0], 1001.2);
        assert_eq!(series.precipitation[2], 0.4);
        assert_eq!(series.humidity[1], 81.0);
    }

    #[test]
    fn test_parse_response_maps_null_to_nan() {
        let series = parse_forecast_response(SAMPLE_BODY).unwrap();
        assert!(series.pressure[1].is_nan(), "null pressure should become NaN");
    }

    #[test]
    fn test_parse_empty_time_array_is_no_data() {
        let body = r#"{"hourly": {
            "time": [],
            "surface_pressure": [],
            "precipitation": [],
            "relative_humidity_2m": []
        }}"#;
        let result = parse_forecast_response(body);
        assert!(matches!(result, Err(WeatherError::NoData(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_ragged_arrays_is_malformed() {
        let body = r#"{"hourly": {
            "time": [1722470400, 1722474000],
            "surface_pressure": [1000.0],
            "precipitation": [0.0, 0.0],
            "relative_humidity_2m": [80, 80]
        }}"#;
        let result = parse_forecast_response(body);
        assert!(matches!(result, Err(WeatherError::Malformed(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_missing_hourly_block_is_parse_error() {
        let result = parse_forecast_response(r#"{"latitude": 24.8}"#);
        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let result = parse_forecast_response("<html>bad gateway</html>");
        assert!(matches!(result, Err(WeatherError::Parse(_))));
    }
}
