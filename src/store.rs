//! View state store and the immutable snapshots handed to renderers.
//!
//! [`ViewStore`] is owned by exactly one control thread. Every mutator that
//! can change the filtered set re-runs the filter engine before returning,
//! so a read immediately after a write never sees a stale filtered set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::filter::{self, FilterParam, FilterParams};
use crate::model::{Load, MetricsSnapshot};

/// Canonical mutable view state.
#[derive(Debug, Default)]
pub struct ViewStore {
    full: Arc<Vec<Load>>,
    filtered: Arc<Vec<Load>>,
    selection: Option<String>,
    metrics: Option<Arc<MetricsSnapshot>>,
    params: FilterParams,
    version: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start empty with the given filter parameters.
    pub fn with_params(params: FilterParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    // -- Mutators --

    /// Replace the full load set wholesale and re-filter.
    pub fn set_full_set(&mut self, loads: Vec<Load>) {
        self.full = Arc::new(loads);
        self.updated_at = Some(Utc::now());
        self.refilter();
    }

    /// Replace the metrics snapshot wholesale.
    pub fn set_metrics(&mut self, metrics: MetricsSnapshot) {
        self.metrics = Some(Arc::new(metrics));
        self.updated_at = Some(Utc::now());
        self.version += 1;
    }

    /// Change one filter dimension and re-filter.
    pub fn set_filter_param(&mut self, param: FilterParam) {
        self.params.set(param);
        self.refilter();
    }

    /// Change several filter dimensions and re-filter once.
    pub fn update_filter_params(&mut self, params: impl IntoIterator<Item = FilterParam>) {
        for param in params {
            self.params.set(param);
        }
        self.refilter();
    }

    /// Replace all filter parameters at once and re-filter.
    pub fn set_filter_params(&mut self, params: FilterParams) {
        self.params = params;
        self.refilter();
    }

    /// Select a load by id, or clear the selection with `None`.
    ///
    /// The id is not validated against the current set.
    pub fn select(&mut self, load_id: Option<String>) {
        self.selection = load_id;
        self.version += 1;
    }

    fn refilter(&mut self) {
        self.filtered = Arc::new(filter::apply(&self.full, &self.params));
        self.version += 1;
    }

    // -- Accessors --

    pub fn full_set(&self) -> &[Load] {
        &self.full
    }

    pub fn filtered_set(&self) -> &[Load] {
        &self.filtered
    }

    /// The selected id, even if it no longer exists in the full set.
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// The selected load, if its id is present in the current full set.
    pub fn selected_load(&self) -> Option<&Load> {
        self.lookup(self.selection.as_deref()?)
    }

    pub fn lookup(&self, load_id: &str) -> Option<&Load> {
        self.full.iter().find(|l| l.load_id == load_id)
    }

    pub fn metrics(&self) -> Option<&MetricsSnapshot> {
        self.metrics.as_deref()
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Capture an immutable snapshot for the renderers.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            filtered: Arc::clone(&self.filtered),
            full: Arc::clone(&self.full),
            selection: self.selection.clone(),
            selected: self.selected_load().cloned(),
            metrics: self.metrics.clone(),
            params: self.params.clone(),
            updated_at: self.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable copy of the store at one instant.
///
/// Cloning is cheap: the load sets and metrics are shared.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub version: u64,
    pub filtered: Arc<Vec<Load>>,
    #[serde(skip)]
    pub full: Arc<Vec<Load>>,
    pub selection: Option<String>,
    pub selected: Option<Load>,
    pub metrics: Option<Arc<MetricsSnapshot>>,
    pub params: FilterParams,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn total_loads(&self) -> usize {
        self.full.len()
    }

    /// Full set, for lookups such as call routes.
    pub fn full_set(&self) -> &[Load] {
        &self.full
    }

    /// Recent calls paired with the route of their load (if known).
    pub fn call_rows(&self) -> Vec<CallRow> {
        let Some(metrics) = &self.metrics else {
            return Vec::new();
        };
        metrics
            .recent_calls
            .iter()
            .map(|call| CallRow {
                route: call.route(&self.full),
                call: call.clone(),
            })
            .collect()
    }
}

/// A recent call with its route resolved against the full set.
#[derive(Debug, Clone, Serialize)]
pub struct CallRow {
    #[serde(flatten)]
    pub call: crate::model::CallRecord,
    pub route: Option<String>,
}

/// Snapshot plus the derived fields the web dashboard shows.
#[derive(Debug, Serialize)]
pub struct SnapshotView<'a> {
    #[serde(flatten)]
    pub snapshot: &'a Snapshot,
    pub total_loads: usize,
    pub calls: Vec<CallRow>,
    pub outcome_series: Vec<(String, u64)>,
    pub sentiment_series: Vec<(String, u64)>,
}

impl<'a> SnapshotView<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        let (outcome_series, sentiment_series) = match &snapshot.metrics {
            Some(m) => (m.outcome_series(), m.sentiment_series()),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            snapshot,
            total_loads: snapshot.total_loads(),
            calls: snapshot.call_rows(),
            outcome_series,
            sentiment_series,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Tab;
    use crate::model::{RawLoad, normalize};

    fn load(id: &str, status: &str) -> Load {
        normalize(RawLoad {
            load_id: id.to_string(),
            origin: "Chicago, IL".to_string(),
            destination: "Dallas, TX".to_string(),
            equipment_type: "Reefer".to_string(),
            status: Some(status.to_string()),
            ..RawLoad::default()
        })
    }

    #[test]
    fn new_store_is_empty() {
        let store = ViewStore::new();
        assert!(store.full_set().is_empty());
        assert!(store.filtered_set().is_empty());
        assert!(store.selection().is_none());
        assert!(store.metrics().is_none());
        assert_eq!(store.params().tab, Tab::Available);
    }

    #[test]
    fn set_full_set_refilters_immediately() {
        let mut store = ViewStore::new();
        store.set_full_set(vec![load("A", "available"), load("B", "booked")]);
        assert_eq!(store.filtered_set().len(), 1);

        store.set_filter_param(FilterParam::Tab(Tab::All));
        assert_eq!(store.filtered_set().len(), 2);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut store = ViewStore::new();
        let v0 = store.version();
        store.set_full_set(Vec::new());
        store.set_metrics(MetricsSnapshot::default());
        store.select(Some("A".to_string()));
        store.set_filter_param(FilterParam::Search("x".to_string()));
        assert_eq!(store.version(), v0 + 4);
    }

    #[test]
    fn batched_filter_update_bumps_version_once() {
        let mut store = ViewStore::new();
        store.set_full_set(vec![load("A", "available"), load("B", "booked")]);
        let v0 = store.version();
        store.update_filter_params([
            FilterParam::Tab(Tab::All),
            FilterParam::Equipment("Reefer".to_string()),
            FilterParam::Search("chi".to_string()),
        ]);
        assert_eq!(store.version(), v0 + 1);
        assert_eq!(store.params().tab, Tab::All);
        assert_eq!(store.params().search_query, "chi");
        assert_eq!(store.filtered_set().len(), 2);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let mut store = ViewStore::new();
        store.set_full_set(vec![load("A", "available")]);
        let snap = store.snapshot();
        store.set_full_set(Vec::new());
        assert_eq!(snap.filtered.len(), 1);
        assert_eq!(snap.total_loads(), 1);
        assert!(store.filtered_set().is_empty());
    }

    #[test]
    fn snapshot_resolves_selected_load() {
        let mut store = ViewStore::new();
        store.set_full_set(vec![load("A", "available")]);
        store.select(Some("A".to_string()));
        let snap = store.snapshot();
        assert_eq!(snap.selected.as_ref().map(|l| l.load_id.as_str()), Some("A"));
    }

    #[test]
    fn snapshot_view_serializes_derived_fields() {
        let mut store = ViewStore::new();
        store.set_full_set(vec![load("A", "available")]);
        let snap = store.snapshot();
        let json = serde_json::to_value(SnapshotView::new(&snap)).unwrap();
        assert_eq!(json["total_loads"], 1);
        assert_eq!(json["filtered"][0]["status"], "Available");
        assert_eq!(json["params"]["tab"], "available");
        assert!(json["calls"].as_array().unwrap().is_empty());
    }
}
