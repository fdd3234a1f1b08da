/// HTTP client for the brokerage backend.
///
/// Uses a synchronous `ureq` agent with a per-request timeout. The bearer
/// credential comes from static configuration and is attached to every
/// authenticated request.
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;

use super::{DataSource, FetchError};
use crate::config::schema::ApiConfig;
use crate::model::{MetricsSnapshot, RawLoad};

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

/// `GET /api/v1/loads` wraps the list as `{ "body": { "loads": [...] } }`.
#[derive(Debug, Default, Deserialize)]
struct LoadsEnvelope {
    #[serde(default)]
    body: Option<LoadsBody>,
}

#[derive(Debug, Default, Deserialize)]
struct LoadsBody {
    #[serde(default)]
    loads: Option<Vec<RawLoad>>,
}

/// Decode a loads response body. A missing `body.loads` is an empty list.
pub fn decode_loads(raw: &str) -> Result<Vec<RawLoad>, FetchError> {
    let envelope: LoadsEnvelope =
        serde_json::from_str(raw).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(envelope.body.and_then(|b| b.loads).unwrap_or_default())
}

/// Decode a metrics response body.
pub fn decode_metrics(raw: &str) -> Result<MetricsSnapshot, FetchError> {
    serde_json::from_str(raw).map_err(|e| FetchError::Malformed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking HTTP data source.
///
/// Cheap to share across fetch worker threads: the agent is internally
/// reference counted.
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpDataSource {
    /// Build a client from the resolved `[api]` section.
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(&config.base_url, &config.api_key, config.timeout())
    }

    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_authorized(&self, url: &str) -> ureq::Request {
        self.agent
            .get(url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Accept", "application/json")
    }

    /// Probe `GET /healthcheck` (unauthenticated). Used by `loadwatch health`.
    pub fn health(&self) -> Result<serde_json::Value, FetchError> {
        let url = format!("{}/healthcheck", self.base_url);
        let body = self.agent.get(&url).call()?.into_string().map_err(io_error)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

impl DataSource for HttpDataSource {
    fn fetch_metrics(&self) -> Result<MetricsSnapshot, FetchError> {
        let url = format!("{}/metrics", self.base_url);
        let body = self
            .get_authorized(&url)
            .call()?
            .into_string()
            .map_err(io_error)?;
        decode_metrics(&body)
    }

    fn fetch_loads(&self) -> Result<Vec<RawLoad>, FetchError> {
        let url = format!("{}/api/v1/loads", self.base_url);
        let cache_buster = Utc::now().timestamp_millis().to_string();
        let body = self
            .get_authorized(&url)
            .query("include_booked", "true")
            .query("t", &cache_buster)
            .call()?
            .into_string()
            .map_err(io_error)?;
        decode_loads(&body)
    }
}

/// Reading the body failed after the status line arrived.
fn io_error(err: std::io::Error) -> FetchError {
    FetchError::Transport(err.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
