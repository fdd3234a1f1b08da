//! The load board: view store plus renderers, owned by the control thread.
//!
//! Fetch outcomes and user commands arrive as [`Event`]s. Each one is
//! applied to the [`ViewStore`] on its own, and every renderer is notified
//! with a fresh snapshot afterwards. A failed or empty fetch leaves the
//! previous data in place.

use std::sync::mpsc::Sender;

use crate::activity::ActivityLog;
use crate::filter::FilterParam;
use crate::model::{LoadStatus, MetricsSnapshot, RawLoad, normalize_all};
use crate::render::Renderer;
use crate::store::{Snapshot, ViewStore};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A user-originated change to view state.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFilter(FilterParam),
    /// Several dimensions changed together; published once.
    SetFilters(Vec<FilterParam>),
    Select(Option<String>),
    /// No change; used to read the current snapshot.
    Snapshot,
}

/// Everything the control thread reacts to.
#[derive(Debug)]
pub enum Event {
    /// Outcome of the metrics fetch of `cycle`. `None` means it failed.
    Metrics {
        cycle: u64,
        metrics: Option<MetricsSnapshot>,
    },
    /// Outcome of the loads fetch of `cycle`. Empty on failure.
    Loads { cycle: u64, loads: Vec<RawLoad> },
    /// A command, optionally answered with the snapshot after applying it.
    Command {
        command: Command,
        reply: Option<Sender<Snapshot>>,
    },
    /// Start a cycle now, bypassing the debounce guard.
    RefreshNow,
    Stop,
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

pub struct Board {
    store: ViewStore,
    renderers: Vec<Box<dyn Renderer>>,
    log: ActivityLog,
}

impl Board {
    pub fn new(store: ViewStore, log: ActivityLog) -> Self {
        Self {
            store,
            renderers: Vec::new(),
            log,
        }
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.add_renderer(Box::new(renderer));
        self
    }

    pub fn add_renderer(&mut self, renderer: Box<dyn Renderer>) {
        self.renderers.push(renderer);
    }

    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Apply a data or command event. Control events are ignored here.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Metrics { cycle, metrics } => {
                if let Some(metrics) = metrics {
                    self.apply_metrics(cycle, metrics);
                }
            }
            Event::Loads { cycle, loads } => {
                self.apply_loads(cycle, loads);
            }
            Event::Command { command, reply } => {
                self.apply_command(command);
                if let Some(reply) = reply {
                    let _ = reply.send(self.store.snapshot());
                }
            }
            Event::RefreshNow | Event::Stop => {}
        }
    }

    pub fn apply_metrics(&mut self, cycle: u64, metrics: MetricsSnapshot) {
        self.log.info(
            "metrics_applied",
            format!(
                "{} calls, {} bookings",
                metrics.total_calls, metrics.successful_bookings
            ),
            Some(cycle),
        );
        self.store.set_metrics(metrics);
        self.publish();
    }

    /// Replace the full set with `raw`, unless it is empty.
    ///
    /// Returns whether the store changed.
    pub fn apply_loads(&mut self, cycle: u64, raw: Vec<RawLoad>) -> bool {
        if raw.is_empty() {
            self.log.debug("loads_skipped", "no loads in response", Some(cycle));
            return false;
        }

        let loads = normalize_all(raw);
        let booked = loads
            .iter()
            .filter(|l| l.status == LoadStatus::Booked)
            .count();
        self.log.info(
            "loads_applied",
            format!("{} loads, {} booked", loads.len(), booked),
            Some(cycle),
        );
        self.store.set_full_set(loads);
        self.publish();
        true
    }

    pub fn apply_command(&mut self, command: Command) {
        match command {
            Command::SetFilter(param) => self.store.set_filter_param(param),
            Command::SetFilters(params) => self.store.update_filter_params(params),
            Command::Select(load_id) => self.store.select(load_id),
            Command::Snapshot => return,
        }
        self.publish();
    }

    /// Push the current snapshot to every renderer.
    pub fn publish(&mut self) {
        let snapshot = self.store.snapshot();
        for renderer in &mut self.renderers {
            renderer.render(&snapshot);
        }
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("store", &self.store)
            .field("renderers", &self.renderers.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
