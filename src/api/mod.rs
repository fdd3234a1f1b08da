//! Remote data access.
//!
//! The [`DataSource`] trait decouples the refresh pipeline from the
//! concrete backend. [`HttpDataSource`] talks to the brokerage API;
//! [`StaticDataSource`] serves fixed data for demos and tests.
//!
//! [`fetch_metrics`] and [`fetch_loads`] are the fetch boundary: they turn
//! every failure into a log entry plus "no data", so nothing past this
//! point ever sees an error.

mod error;
mod http;

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use error::FetchError;
pub use http::{HttpDataSource, decode_loads, decode_metrics};

use crate::activity::ActivityLog;
use crate::model::{CallRecord, MetricsSnapshot, RawLoad};

// ---------------------------------------------------------------------------
// Data source trait
// ---------------------------------------------------------------------------

/// Read-only access to the two backend resources.
///
/// Both operations are idempotent and side-effect-free on the server, and
/// may be called concurrently from different threads.
pub trait DataSource: Send + Sync {
    /// Aggregate call metrics.
    fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError>;

    /// The full load set, booked loads included.
    fn fetch_loads(&self) -> Result<Vec<RawLoad>, FetchError>;
}

// ---------------------------------------------------------------------------
// Fetch boundary
// ---------------------------------------------------------------------------

/// Fetch metrics; log and return `None` on any failure. Never retries.
pub fn fetch_metrics(
    source: &dyn DataSource,
    log: &ActivityLog,
    cycle: Option<u64>,
) -> Option<MetricsSnapshot> {
    match source.fetch_metrics() {
        Ok(metrics) => Some(metrics),
        Err(err) => {
            log.warn(
                "fetch_failed",
                format!("metrics: {} ({})", err, err.kind()),
                cycle,
            );
            None
        }
    }
}

/// Fetch loads; log and return an empty list on any failure. Never retries.
pub fn fetch_loads(source: &dyn DataSource, log: &ActivityLog, cycle: Option<u64>) -> Vec<RawLoad> {
    match source.fetch_loads() {
        Ok(loads) => {
            log.debug("loads_fetched", format!("{} loads", loads.len()), cycle);
            loads
        }
        Err(err) => {
            log.warn(
                "fetch_failed",
                format!("loads: {} ({})", err, err.kind()),
                cycle,
            );
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Static data source
// ---------------------------------------------------------------------------

/// In-memory data source with swappable responses.
///
/// A `None` response makes the corresponding fetch fail with HTTP 500.
#[derive(Debug, Default)]
pub struct StaticDataSource {
    metrics: Mutex<Option<MetricsSnapshot>>,
    loads: Mutex<Option<Vec<RawLoad>>>,
    metrics_calls: AtomicUsize,
    loads_calls: AtomicUsize,
}

impl StaticDataSource {
    pub fn new(metrics: Option<MetricsSnapshot>, loads: Option<Vec<RawLoad>>) -> Self {
        Self {
            metrics: Mutex::new(metrics),
            loads: Mutex::new(loads),
            ..Self::default()
        }
    }

    /// A small fixed board for `--demo` runs.
    pub fn sample() -> Self {
        Self::new(Some(sample_metrics()), Some(sample_loads()))
    }

    pub fn set_metrics(&self, metrics: Option<MetricsSnapshot>) {
        if let Ok(mut slot) = self.metrics.lock() {
            *slot = metrics;
        }
    }

    pub fn set_loads(&self, loads: Option<Vec<RawLoad>>) {
        if let Ok(mut slot) = self.loads.lock() {
            *slot = loads;
        }
    }

    /// Number of `fetch_metrics` calls so far.
    pub fn metrics_calls(&self) -> usize {
        self.metrics_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_loads` calls so far.
    pub fn loads_calls(&self) -> usize {
        self.loads_calls.load(Ordering::SeqCst)
    }
}

impl DataSource for StaticDataSource {
    fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError> {
        self.metrics_calls.fetch_add(1, Ordering::SeqCst);
        let slot = self
            .metrics
            .lock()
            .map_err(|_| FetchError::Transport("poisoned".to_string()))?;
        slot.clone().ok_or(FetchError::HttpStatus { status: 500 })
    }

    fn fetch_loads(&self) -> Result<Vec<RawLoad>, FetchError> {
        self.loads_calls.fetch_add(1, Ordering::SeqCst);
        let slot = self
            .loads
            .lock()
            .map_err(|_| FetchError::Transport("poisoned".to_string()))?;
        slot.clone().ok_or(FetchError::HttpStatus { status: 500 })
    }
}

fn sample_load(
    id: &str,
    origin: &str,
    destination: &str,
    equipment: &str,
    status: &str,
    miles: f64,
    rate: f64,
) -> RawLoad {
    RawLoad {
        load_id: id.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        pickup_datetime: "2025-08-12T08:00:00".to_string(),
        delivery_datetime: "2025-08-13T17:00:00".to_string(),
        equipment_type: equipment.to_string(),
        status: Some(status.to_string()),
        miles,
        posted_carrier_rate: Some(rate),
        loadboard_rate: Some(rate),
        max_buy: (rate * 1.05 * 100.0).round() / 100.0,
        weight: Some(42_000.0),
        commodity_type: Some("General Freight".to_string()),
        ..RawLoad::default()
    }
}

fn sample_loads() -> Vec<RawLoad> {
    vec![
        sample_load("LOAD-001", "Chicago, IL", "Dallas, TX", "Reefer", "available", 925.0, 2450.0),
        sample_load("LOAD-002", "Los Angeles, CA", "Phoenix, AZ", "Dry Van", "booked", 372.0, 1150.0),
        sample_load("LOAD-003", "Atlanta, GA", "Miami, FL", "Flatbed", "available", 662.0, 1900.0),
        sample_load("LOAD-004", "Denver, CO", "Chicago, IL", "Dry Van", "available", 1003.0, 2600.0),
        sample_load("LOAD-005", "Seattle, WA", "Portland, OR", "Reefer", "booked", 174.0, 780.0),
    ]
}

fn sample_metrics() -> MetricsSnapshot {
    let call = |carrier: &str, mc: &str, load: &str, outcome: &str, rate: Option<f64>, sentiment: &str| CallRecord {
        timestamp: "2025-08-11T14:30:00".to_string(),
        carrier_name: Some(carrier.to_string()),
        mc_number: mc.to_string(),
        load_id: Some(load.to_string()),
        outcome: outcome.to_string(),
        agreed_rate: rate,
        sentiment: sentiment.to_string(),
        negotiation_rounds: 2,
    };

    MetricsSnapshot {
        total_calls: 4,
        successful_bookings: 2,
        success_rate: 50.0,
        total_booked_value: 1930.0,
        avg_negotiation_rounds: 2.0,
        calls_by_outcome: [("booked".to_string(), 2), ("no_agreement".to_string(), 1), ("not_interested".to_string(), 1)]
            .into_iter()
            .collect(),
        sentiment_breakdown: [("positive".to_string(), 2), ("neutral".to_string(), 1), ("negative".to_string(), 1)]
            .into_iter()
            .collect(),
        recent_calls: vec![
            call("Swift Logistics Inc", "2345678", "LOAD-002", "booked", Some(1150.0), "positive"),
            call("Prime Movers LLC", "4567890", "LOAD-005", "booked", Some(780.0), "positive"),
            call("Eagle Transport Services", "3456789", "LOAD-001", "no_agreement", None, "negative"),
            call("Midwest Trucking Inc", "8901234", "LOAD-004", "not_interested", None, "neutral"),
        ],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
