//! Monitored location registry.
//!
//! The service watches a single coastal city. Its coordinates, display
//! address and fixed local offset live here so every other module refers to
//! the same point instead of hardcoding coordinates.

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Location metadata
// ---------------------------------------------------------------------------

/// A geographic point the monitor polls weather for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitoredLocation {
    /// Short name used in alert titles.
    pub name: String,
    /// Human-readable address sent with every alert.
    pub address: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Fixed offset of local civil time from UTC, in hours.
    /// Karachi does not observe daylight saving, so a fixed offset is exact.
    pub utc_offset_hours: i32,
}

impl MonitoredLocation {
    /// Local time offset, falling back to UTC for an out-of-range value.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or(Utc.fix())
    }

    /// Alert title prefix, e.g. "Karachi Flood Alert".
    pub fn alert_title(&self, status_text: &str) -> String {
        format!("{} Flood Alert: {}", self.name, status_text)
    }
}

impl Default for MonitoredLocation {
    fn default() -> Self {
        karachi()
    }
}

/// Karachi, Pakistan (Pakistan Standard Time, UTC+5).
pub const KARACHI_LAT: f64 = 24.8608;
pub const KARACHI_LON: f64 = 67.0104;

pub fn karachi() -> MonitoredLocation {
    MonitoredLocation {
        name: "Karachi".to_string(),
        address: "Karachi, Pakistan".to_string(),
        latitude: KARACHI_LAT,
        longitude: KARACHI_LON,
        utc_offset_hours: 5,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
