//! Load and call-metrics records as delivered by the brokerage backend.
//!
//! [`RawLoad`] is the wire shape of one entry in the loads response;
//! [`normalize`] turns it into a [`Load`] by recomputing the status. All
//! other fields, including ones this crate does not know about, pass
//! through unchanged.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Load status
// ---------------------------------------------------------------------------

/// Booking status of a load as shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStatus {
    Available,
    Booked,
    /// Display-only value. The backend feed never produces it.
    Covered,
}

impl LoadStatus {
    /// Map the lowercase wire value to a board status.
    ///
    /// Only `"booked"` maps to [`LoadStatus::Booked`]; everything else,
    /// including a missing value, is [`LoadStatus::Available`].
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("booked") => Self::Booked,
            _ => Self::Available,
        }
    }

    /// Badge colour used by the renderers.
    pub fn color(self) -> &'static str {
        match self {
            Self::Available => "green",
            Self::Booked => "blue",
            Self::Covered => "gray",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Booked => write!(f, "Booked"),
            Self::Covered => write!(f, "Covered"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw and normalized loads
// ---------------------------------------------------------------------------

/// One load exactly as the backend sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLoad {
    pub load_id: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub pickup_datetime: String,
    #[serde(default)]
    pub delivery_datetime: String,
    #[serde(default)]
    pub equipment_type: String,
    /// Lowercase status string (`"booked"`, `"available"`, ...).
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub miles: f64,
    #[serde(default)]
    pub posted_carrier_rate: Option<f64>,
    #[serde(default)]
    pub loadboard_rate: Option<f64>,
    #[serde(default)]
    pub max_buy: f64,
    #[serde(default)]
    pub rate_per_mile: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub commodity_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Any fields not modelled above (stops, contact, bridge, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A load after normalization. This is what the store and filters see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub load_id: String,
    pub origin: String,
    pub destination: String,
    pub pickup_datetime: String,
    pub delivery_datetime: String,
    pub equipment_type: String,
    pub status: LoadStatus,
    pub miles: f64,
    pub posted_carrier_rate: Option<f64>,
    pub loadboard_rate: Option<f64>,
    pub max_buy: f64,
    pub rate_per_mile: Option<f64>,
    pub weight: Option<f64>,
    pub commodity_type: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Recompute the status of a raw load; every other field passes through.
pub fn normalize(raw: RawLoad) -> Load {
    Load {
        status: LoadStatus::from_raw(raw.status.as_deref()),
        load_id: raw.load_id,
        origin: raw.origin,
        destination: raw.destination,
        pickup_datetime: raw.pickup_datetime,
        delivery_datetime: raw.delivery_datetime,
        equipment_type: raw.equipment_type,
        miles: raw.miles,
        posted_carrier_rate: raw.posted_carrier_rate,
        loadboard_rate: raw.loadboard_rate,
        max_buy: raw.max_buy,
        rate_per_mile: raw.rate_per_mile,
        weight: raw.weight,
        commodity_type: raw.commodity_type,
        notes: raw.notes,
        extra: raw.extra,
    }
}

/// Normalize a whole loads response, preserving order.
pub fn normalize_all(raw: Vec<RawLoad>) -> Vec<Load> {
    raw.into_iter().map(normalize).collect()
}

impl Load {
    /// Posted carrier rate, falling back to the loadboard rate, else 0.
    pub fn effective_rate(&self) -> f64 {
        self.posted_carrier_rate
            .or(self.loadboard_rate)
            .unwrap_or(0.0)
    }

    /// Server-computed rate per mile, or effective rate over miles.
    pub fn rate_per_mile(&self) -> f64 {
        if let Some(rpm) = self.rate_per_mile {
            return rpm;
        }
        if self.miles > 0.0 {
            self.effective_rate() / self.miles
        } else {
            0.0
        }
    }

    pub fn origin_city(&self) -> &str {
        first_segment(&self.origin)
    }

    pub fn destination_city(&self) -> &str {
        first_segment(&self.destination)
    }

    /// `"Chicago → Dallas"` style route label.
    pub fn route(&self) -> String {
        format!("{} → {}", self.origin_city(), self.destination_city())
    }

    pub fn pickup_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.pickup_datetime)
    }

    pub fn delivery_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.delivery_datetime)
    }

    pub fn pickup_date(&self) -> Option<NaiveDate> {
        self.pickup_at().map(|dt| dt.date())
    }

    pub fn delivery_date(&self) -> Option<NaiveDate> {
        self.delivery_at().map(|dt| dt.date())
    }

    pub fn commodity_or_default(&self) -> &str {
        self.commodity_type.as_deref().unwrap_or("General")
    }

    /// Text the free-text search runs against.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.load_id, self.origin, self.destination, self.equipment_type
        )
    }
}

fn first_segment(location: &str) -> &str {
    location.split(',').next().unwrap_or(location).trim()
}

/// Parse an ISO-8601 timestamp with or without an offset.
///
/// Offset-carrying values are reduced to their local wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

// ---------------------------------------------------------------------------
// Call metrics
// ---------------------------------------------------------------------------

/// One logged carrier call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallRecord {
    pub timestamp: String,
    pub carrier_name: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub mc_number: String,
    pub load_id: Option<String>,
    pub outcome: String,
    pub agreed_rate: Option<f64>,
    pub sentiment: String,
    pub negotiation_rounds: u32,
}

impl CallRecord {
    pub fn carrier_or_unknown(&self) -> &str {
        self.carrier_name.as_deref().unwrap_or("Unknown")
    }

    /// Route of the call's load, looked up by id in `loads`.
    pub fn route(&self, loads: &[Load]) -> Option<String> {
        let id = self.load_id.as_deref()?;
        loads.iter().find(|l| l.load_id == id).map(Load::route)
    }

    pub fn called_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }
}

/// Aggregate call metrics returned by `GET /metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub total_calls: u64,
    pub successful_bookings: u64,
    /// Percentage, already rounded by the server.
    pub success_rate: f64,
    #[serde(alias = "total_revenue")]
    pub total_booked_value: f64,
    pub avg_negotiation_rounds: f64,
    pub calls_by_outcome: BTreeMap<String, u64>,
    pub sentiment_breakdown: BTreeMap<String, u64>,
    pub recent_calls: Vec<CallRecord>,
}

impl MetricsSnapshot {
    /// `(label, count)` pairs for the outcomes chart.
    pub fn outcome_series(&self) -> Vec<(String, u64)> {
        self.calls_by_outcome
            .iter()
            .map(|(k, v)| (outcome_label(k), *v))
            .collect()
    }

    /// `(label, count)` pairs for the sentiment chart.
    pub fn sentiment_series(&self) -> Vec<(String, u64)> {
        self.sentiment_breakdown
            .iter()
            .map(|(k, v)| (sentiment_label(k), *v))
            .collect()
    }
}

/// `"no_agreement"` → `"No Agreement"`.
pub fn outcome_label(key: &str) -> String {
    key.split('_')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"positive"` → `"Positive"`.
pub fn sentiment_label(key: &str) -> String {
    capitalize(key)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
