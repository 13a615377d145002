//! The polling loop.
//!
//! A two-state machine: POLLING fetches the live forecast window, selects the
//! hour closest to now, classifies it and decides whether to alert; SLEEPING
//! waits one interval on a [`Ticker`]. The loop ends only when the ticker
//! reports a shutdown request.
//!
//! Failures inside a cycle never end the loop. A failed fetch skips straight
//! to SLEEPING and leaves the alert state untouched; a failed delivery is
//! logged and the cycle completes normally.
//!
//! A shutdown request that lands while a cycle is in flight abandons that
//! cycle before the alert decision, so nothing is recorded or sent.

use crate::alert::{AlertDecider, AlertPayload, AlertReceipt, AlertSink};
use crate::analysis::features::current_observation;
use crate::classifier::Classify;
use crate::ingest::{QueryWindow, WeatherSource};
use crate::location::MonitoredLocation;
use crate::logging::{DataSource, log_sink_failure, log_weather_failure};
use crate::model::{FeatureVector, Prediction, WeatherSample};
use chrono::{DateTime, Utc};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::{info, warn};

/// Poll interval used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Sleeping,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Why a sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    Shutdown,
}

/// Blocks between cycles. Implementations decide how waiting is done and
/// how a shutdown request is observed.
pub trait Ticker {
    fn sleep(&mut self, interval: Duration) -> Wake;

    /// Non-blocking check for a pending shutdown request.
    fn shutdown_requested(&mut self) -> bool {
        false
    }
}

/// Sleeps on a channel so a shutdown request wakes it immediately.
///
/// Once a request has been seen the ticker stays stopped.
pub struct ChannelTicker {
    rx: Receiver<()>,
    stopped: bool,
}

/// Sending side of a [`ChannelTicker`].
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    pub fn request_shutdown(&self) {
        // The ticker may already be gone; nothing to wake then.
        let _ = self.tx.send(());
    }
}

pub fn shutdown_channel() -> (ShutdownHandle, ChannelTicker) {
    let (tx, rx) = mpsc::channel();
    let ticker = ChannelTicker { rx, stopped: false };
    (ShutdownHandle { tx }, ticker)
}

impl Ticker for ChannelTicker {
    fn sleep(&mut self, interval: Duration) -> Wake {
        if self.stopped {
            return Wake::Shutdown;
        }
        match self.rx.recv_timeout(interval) {
            Ok(()) => {
                self.stopped = true;
                Wake::Shutdown
            }
            Err(RecvTimeoutError::Timeout) => Wake::Elapsed,
            // No sender left: nobody can ask for shutdown, so just wait.
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(interval);
                Wake::Elapsed
            }
        }
    }

    fn shutdown_requested(&mut self) -> bool {
        if !self.stopped {
            self.stopped = self.rx.try_recv().is_ok();
        }
        self.stopped
    }
}

/// Routes Ctrl+C (and SIGTERM) into a ticker.
pub fn install_interrupt_handler() -> Result<ChannelTicker, ctrlc::Error> {
    let (handle, ticker) = shutdown_channel();
    ctrlc::set_handler(move || handle.request_shutdown())?;
    Ok(ticker)
}

// ---------------------------------------------------------------------------
// Cycle results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryStatus {
    Delivered(AlertReceipt),
    Failed(String),
    /// No sink configured; the alert was only logged.
    SkippedNoSink,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub sample: WeatherSample,
    pub features: FeatureVector,
    pub prediction: Prediction,
    pub alerted: bool,
    /// Set only when `alerted`.
    pub delivery: Option<DeliveryStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    FetchFailed,
    /// The fetch succeeded but held no usable hour.
    NoSample,
    /// Shutdown was requested mid-cycle; no decision was made.
    Interrupted,
    Evaluated(Evaluation),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub fetch_failures: usize,
    pub alerts_triggered: usize,
    pub alerts_delivered: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.cycles += 1;
        match outcome {
            CycleOutcome::FetchFailed => self.fetch_failures += 1,
            CycleOutcome::NoSample | CycleOutcome::Interrupted => {}
            CycleOutcome::Evaluated(eval) => {
                if eval.alerted {
                    self.alerts_triggered += 1;
                }
                if matches!(eval.delivery, Some(DeliveryStatus::Delivered(_))) {
                    self.alerts_delivered += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

pub struct MonitorLoop<W, C, S> {
    source: W,
    classifier: C,
    sink: Option<S>,
    decider: AlertDecider,
    location: MonitoredLocation,
    interval: Duration,
    forecast_days: u32,
    state: MonitorState,
}

impl<W, C, S> MonitorLoop<W, C, S>
where
    W: WeatherSource,
    C: Classify,
    S: AlertSink,
{
    /// A `None` sink runs the monitor in log-only mode.
    pub fn new(source: W, classifier: C, sink: Option<S>, location: MonitoredLocation) -> Self {
        Self {
            source,
            classifier,
            sink,
            decider: AlertDecider::new(),
            location,
            interval: DEFAULT_POLL_INTERVAL,
            forecast_days: 1,
            state: MonitorState::Polling,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_forecast_days(mut self, forecast_days: u32) -> Self {
        self.forecast_days = forecast_days;
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn decider(&self) -> &AlertDecider {
        &self.decider
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one POLLING phase against the given wall-clock time.
    pub fn poll_once_at(&mut self, now: DateTime<Utc>) -> CycleOutcome {
        self.poll_until(now, || false)
    }

    /// Like [`poll_once_at`](Self::poll_once_at), but abandons the cycle if
    /// `interrupted` reports true once the fetch has returned.
    pub fn poll_until<I>(&mut self, now: DateTime<Utc>, mut interrupted: I) -> CycleOutcome
    where
        I: FnMut() -> bool,
    {
        self.state = MonitorState::Polling;
        info!(source = %DataSource::Monitor, "Check at {}", now.format("%Y-%m-%d %H:%M:%S UTC"));

        let window = QueryWindow::Forecast {
            forecast_days: self.forecast_days,
        };
        let series = match self.source.fetch(window) {
            Ok(series) => series,
            Err(e) => {
                log_weather_failure("live forecast fetch", &e);
                return CycleOutcome::FetchFailed;
            }
        };
        if interrupted() {
            info!(source = %DataSource::Monitor, "shutdown requested, abandoning cycle");
            return CycleOutcome::Interrupted;
        }

        let offset = self.location.local_offset();
        let Some((sample, features)) = current_observation(&series, now, offset) else {
            warn!(source = %DataSource::Monitor, "forecast window held no usable hour");
            return CycleOutcome::NoSample;
        };
        if sample.has_missing_readings() {
            warn!(
                source = %DataSource::Monitor,
                index = sample.source_index,
                "selected hour has missing readings; treating them as 0"
            );
        }

        let prediction = self.classifier.classify(&features);
        info!(
            source = %DataSource::Monitor,
            "Status: {} (confidence: {:.1}%)",
            prediction.status_text,
            prediction.confidence
        );
        info!(
            source = %DataSource::Monitor,
            "Pressure: {} | Rain: {} | Humidity: {}",
            sample.pressure,
            sample.precipitation,
            sample.humidity
        );

        if interrupted() {
            info!(source = %DataSource::Monitor, "shutdown requested, abandoning cycle");
            return CycleOutcome::Interrupted;
        }

        let alerted = self.decider.should_alert(&sample, &prediction);
        let delivery = if alerted {
            warn!(
                source = %DataSource::Monitor,
                color = prediction.color_tag,
                "ALERT TRIGGERED: {}",
                prediction.status_text
            );
            Some(self.deliver(&sample, &features, &prediction))
        } else {
            None
        };

        CycleOutcome::Evaluated(Evaluation {
            sample,
            features,
            prediction,
            alerted,
            delivery,
        })
    }

    pub fn poll_once(&mut self) -> CycleOutcome {
        self.poll_once_at(Utc::now())
    }

    fn deliver(
        &self,
        sample: &WeatherSample,
        features: &FeatureVector,
        prediction: &Prediction,
    ) -> DeliveryStatus {
        let Some(sink) = &self.sink else {
            warn!(source = %DataSource::AlertSink, "alert sink not configured, skipping alert");
            return DeliveryStatus::SkippedNoSink;
        };

        let payload = AlertPayload::from_prediction(&self.location, sample, features, prediction);
        match sink.deliver(&payload) {
            Ok(receipt) => {
                info!(
                    source = %DataSource::AlertSink,
                    incident_id = receipt.incident_id.as_deref().unwrap_or("-"),
                    "Alert sent: {}",
                    receipt.status
                );
                DeliveryStatus::Delivered(receipt)
            }
            Err(e) => {
                log_sink_failure(sink.endpoint(), &e);
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }

    /// Alternates POLLING and SLEEPING until the ticker reports shutdown.
    pub fn run<T: Ticker>(&mut self, ticker: &mut T) -> RunSummary {
        self.run_with_clock(ticker, Utc::now)
    }

    pub fn run_with_clock<T, F>(&mut self, ticker: &mut T, mut clock: F) -> RunSummary
    where
        T: Ticker,
        F: FnMut() -> DateTime<Utc>,
    {
        let mut summary = RunSummary::default();
        loop {
            let outcome = self.poll_until(clock(), || ticker.shutdown_requested());
            summary.record(&outcome);
            if outcome == CycleOutcome::Interrupted {
                info!(source = %DataSource::Monitor, "Monitoring stopped");
                return summary;
            }

            self.state = MonitorState::Sleeping;
            info!(
                source = %DataSource::Monitor,
                "Next check in {} minutes",
                self.interval.as_secs() / 60
            );
            if ticker.sleep(self.interval) == Wake::Shutdown {
                info!(source = %DataSource::Monitor, "Monitoring stopped");
                return summary;
            }
        }
    }
}
