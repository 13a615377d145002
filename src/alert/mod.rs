/// Alerting: duplicate suppression, incident payloads, and delivery.
pub mod decider;
pub mod payload;
pub mod sink;

pub use decider::{AlertDecider, AlertState};
pub use payload::AlertPayload;
pub use sink::{AlertReceipt, AlertSink, HttpAlertSink, SinkError};
