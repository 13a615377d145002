//! Flood risk monitoring service.
//!
//! Polls an hourly weather forecast for a single city, classifies the
//! current hour with a random forest trained at startup, and posts
//! deduplicated incident alerts to an HTTP endpoint.

pub mod alert;
pub mod analysis;
pub mod classifier;
pub mod config;
pub mod demo;
pub mod ingest;
pub mod location;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod training;
