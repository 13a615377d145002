//! Incident delivery.
//!
//! Alerts are POSTed once to `{base_url}/flood-alert`. A failed delivery is
//! reported to the caller and never retried.

use super::payload::AlertPayload;
use crate::logging::DataSource;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Route appended to the configured base URL.
pub const ALERT_ROUTE: &str = "/flood-alert";

#[derive(Debug, Error)]
pub enum SinkError {
    /// Non-2xx response from the incident endpoint.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    /// Connection failure, timeout, or body read failure.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The HTTP client could not be constructed.
    #[error("Client setup failed: {0}")]
    Client(String),
}

/// What the endpoint acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertReceipt {
    pub status: u16,
    /// Incident id, when the body carried one.
    pub incident_id: Option<String>,
}

/// Destination for alert payloads.
pub trait AlertSink {
    fn deliver(&self, payload: &AlertPayload) -> Result<AlertReceipt, SinkError>;

    /// Where alerts go, for logs.
    fn endpoint(&self) -> &str;
}

impl<T: AlertSink + ?Sized> AlertSink for &T {
    fn deliver(&self, payload: &AlertPayload) -> Result<AlertReceipt, SinkError> {
        (**self).deliver(payload)
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

#[derive(Debug, Deserialize)]
struct IncidentResponse {
    incident_id: Option<String>,
}

/// Joins a base URL and the alert route, dropping a trailing `/`.
pub fn alert_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), ALERT_ROUTE)
}

/// Turns a status and its body into a receipt.
///
/// A 2xx status means the incident exists, so an unreadable body only costs
/// the incident id.
fn receipt_from_response(
    status: StatusCode,
    body: Result<String, reqwest::Error>,
) -> Result<AlertReceipt, SinkError> {
    if !status.is_success() {
        return Err(SinkError::Http {
            status: status.as_u16(),
            body: body?,
        });
    }

    let incident_id = match body {
        Ok(body) => serde_json::from_str::<IncidentResponse>(&body)
            .ok()
            .and_then(|r| r.incident_id),
        Err(e) => {
            warn!(
                source = %DataSource::AlertSink,
                status = status.as_u16(),
                "alert accepted but response body unreadable: {}",
                e
            );
            None
        }
    };
    Ok(AlertReceipt {
        status: status.as_u16(),
        incident_id,
    })
}

/// Blocking HTTP sink with a bounded request timeout.
pub struct HttpAlertSink {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpAlertSink {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: alert_endpoint(base_url),
        })
    }
}

impl AlertSink for HttpAlertSink {
    fn deliver(&self, payload: &AlertPayload) -> Result<AlertReceipt, SinkError> {
        debug!(
            source = %DataSource::AlertSink,
            endpoint = %self.endpoint,
            title = %payload.title,
            "posting alert"
        );

        let response = self.client.post(&self.endpoint).json(payload).send()?;
        let status = response.status();
        receipt_from_response(status, response.text())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
