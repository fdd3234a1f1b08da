//! JSON API handlers for the web dashboard.
//!
//! Each handler corresponds to one endpoint and returns a JSON response.
//! Malformed requests get a 400; a control thread that does not answer is
//! reported as a 500 by the router.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use super::{HttpResponse, WebState, content_type_json, error_response};
use crate::activity::{ActivityEntry, Level};
use crate::board::Command;
use crate::config::schema::LoadwatchConfig;
use crate::filter::{FilterParam, Tab};
use crate::store::{Snapshot, SnapshotView};

// ---------------------------------------------------------------------------
// Request and response types
// ---------------------------------------------------------------------------

/// `PUT /api/filters` body. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
struct FilterUpdateRequest {
    tab: Option<String>,
    equipment_type: Option<String>,
    #[serde(alias = "search_query")]
    search: Option<String>,
}

impl FilterUpdateRequest {
    fn into_params(self) -> Result<Vec<FilterParam>, String> {
        let mut params = Vec::new();
        if let Some(tab) = self.tab {
            let tab = Tab::parse(&tab).ok_or_else(|| format!("unknown tab '{tab}'"))?;
            params.push(FilterParam::Tab(tab));
        }
        if let Some(equipment) = self.equipment_type {
            params.push(FilterParam::Equipment(equipment));
        }
        if let Some(search) = self.search {
            params.push(FilterParam::Search(search));
        }
        Ok(params)
    }
}

/// `PUT /api/selection` body. `null` clears the selection.
#[derive(Debug, Deserialize)]
struct SelectionRequest {
    load_id: Option<String>,
}

#[derive(Serialize)]
struct ConfigResponse {
    config: LoadwatchConfig,
    toml_text: String,
}

#[derive(Serialize)]
struct HealthResponse {
    backend_url: String,
    uptime_secs: u64,
    version: u64,
    last_update: Option<String>,
    total_loads: usize,
    metrics_available: bool,
    log_path: Option<String>,
    recent_failures: Vec<ActivityEntry>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

fn snapshot_response(snapshot: &Snapshot) -> Result<HttpResponse> {
    json_response(&SnapshotView::new(snapshot))
}

/// Apply `command` on the control thread and return the snapshot after it.
fn apply_command(state: &WebState, command: Command) -> Result<Snapshot> {
    state
        .client
        .request(command)
        .ok_or_else(|| anyhow!("control thread did not respond"))
}

/// Hide all but the last four characters of a credential.
fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/snapshot`: latest published board state.
pub fn get_snapshot(state: &WebState) -> Result<HttpResponse> {
    snapshot_response(&state.snapshot.latest())
}

/// `PUT /api/filters`: change one or more filter dimensions.
///
/// Body: `{ "tab": "all", "equipment_type": "Reefer", "search": "chi" }`
pub fn put_filters(state: &WebState, body: &str) -> Result<HttpResponse> {
    let req: FilterUpdateRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return Ok(error_response(400, &format!("invalid JSON: {e}"))),
    };
    let params = match req.into_params() {
        Ok(params) if params.is_empty() => return Ok(error_response(400, "no filter fields given")),
        Ok(params) => params,
        Err(msg) => return Ok(error_response(400, &msg)),
    };

    snapshot_response(&apply_command(state, Command::SetFilters(params))?)
}

/// `PUT /api/selection`: select a load or clear the selection.
pub fn put_selection(state: &WebState, body: &str) -> Result<HttpResponse> {
    let req: SelectionRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => return Ok(error_response(400, &format!("invalid JSON: {e}"))),
    };
    let snapshot = apply_command(state, Command::Select(req.load_id))?;
    snapshot_response(&snapshot)
}

/// `POST /api/refresh`: start a cycle now.
pub fn post_refresh(state: &WebState) -> Result<HttpResponse> {
    if !state.client.refresh_now() {
        return Err(anyhow!("control thread has stopped"));
    }
    json_response(&serde_json::json!({ "success": true }))
}

/// `GET /api/config`: effective configuration, credential masked.
pub fn get_config(state: &WebState) -> Result<HttpResponse> {
    let mut config = state.config.clone();
    config.api.api_key = mask(&config.api.api_key);
    let toml_text = toml::to_string_pretty(&config).unwrap_or_default();
    json_response(&ConfigResponse { config, toml_text })
}

/// `GET /api/health`: board freshness and recent fetch failures.
pub fn get_health(state: &WebState) -> Result<HttpResponse> {
    let snapshot = state.snapshot.latest();
    let resp = HealthResponse {
        backend_url: state.config.api.base_url.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: snapshot.version,
        last_update: snapshot.updated_at.map(|t| t.to_rfc3339()),
        total_loads: snapshot.total_loads(),
        metrics_available: snapshot.metrics.is_some(),
        log_path: state.log.path().map(|p| p.display().to_string()),
        recent_failures: state.log.recent(Level::Warn, 10),
    };
    json_response(&resp)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_request_collects_present_fields() {
        let req: FilterUpdateRequest =
            serde_json::from_str(r#"{"tab": "all", "search": "chi"}"#).unwrap();
        assert_eq!(
            req.into_params().unwrap(),
            vec![
                FilterParam::Tab(Tab::All),
                FilterParam::Search("chi".to_string())
            ]
        );
    }

    #[test]
    fn filter_request_accepts_search_query_alias() {
        let req: FilterUpdateRequest =
            serde_json::from_str(r#"{"search_query": "reefer"}"#).unwrap();
        assert_eq!(
            req.into_params().unwrap(),
            vec![FilterParam::Search("reefer".to_string())]
        );
    }

    #[test]
    fn filter_request_rejects_unknown_tab() {
        let req: FilterUpdateRequest = serde_json::from_str(r#"{"tab": "covered"}"#).unwrap();
        assert!(req.into_params().unwrap_err().contains("covered"));
    }

    #[test]
    fn empty_equipment_is_kept_as_clear() {
        let req: FilterUpdateRequest =
            serde_json::from_str(r#"{"equipment_type": ""}"#).unwrap();
        assert_eq!(
            req.into_params().unwrap(),
            vec![FilterParam::Equipment(String::new())]
        );
    }

    #[test]
    fn selection_request_accepts_null() {
        let req: SelectionRequest = serde_json::from_str(r#"{"load_id": null}"#).unwrap();
        assert!(req.load_id.is_none());
        let req: SelectionRequest = serde_json::from_str(r#"{"load_id": "LOAD-001"}"#).unwrap();
        assert_eq!(req.load_id.as_deref(), Some("LOAD-001"));
    }

    #[test]
    fn mask_keeps_tail() {
        assert_eq!(mask("acme_dev_test_key_123"), "*****************_123");
        assert_eq!(mask("abc"), "***");
        assert_eq!(mask(""), "");
    }
}
