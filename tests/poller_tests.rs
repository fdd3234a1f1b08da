/// Poller and control-loop tests.
///
/// Fetch outcomes are applied independently: a failing metrics fetch must
/// not block a successful loads fetch, and a failing fetch must leave the
/// previous data in place. Guard timing runs against a manual clock.
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use loadwatch::activity::{ActivityLog, Level, read_entries};
use loadwatch::api::StaticDataSource;
use loadwatch::board::{Board, Command, Event};
use loadwatch::config::schema::RefreshConfig;
use loadwatch::filter::{FilterParam, Tab};
use loadwatch::model::{MetricsSnapshot, RawLoad};
use loadwatch::poller::{self, ManualClock, Poller};
use loadwatch::render::{Renderer, SharedSnapshot};
use loadwatch::store::{Snapshot, ViewStore};

fn raw(id: &str, status: &str) -> RawLoad {
    RawLoad {
        load_id: id.to_string(),
        origin: "Chicago, IL".to_string(),
        destination: "Dallas, TX".to_string(),
        equipment_type: "Reefer".to_string(),
        status: Some(status.to_string()),
        ..RawLoad::default()
    }
}

fn metrics(total_calls: u64) -> MetricsSnapshot {
    MetricsSnapshot {
        total_calls,
        ..MetricsSnapshot::default()
    }
}

fn refresh(interval_ms: u64, guard_ms: u64) -> RefreshConfig {
    RefreshConfig {
        interval_ms,
        guard_ms,
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Snapshot>>>);

impl Recorder {
    fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    fn last(&self) -> Option<Snapshot> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Renderer for Recorder {
    fn render(&mut self, snapshot: &Snapshot) {
        self.0.lock().unwrap().push(snapshot.clone());
    }
}

// ---------------------------------------------------------------------------
// Independent application of fetch outcomes
// ---------------------------------------------------------------------------

#[test]
fn metrics_failure_on_first_cycle_leaves_metrics_empty() {
    let source = StaticDataSource::new(None, Some(vec![raw("A", "available"), raw("B", "booked")]));
    let log = ActivityLog::disabled();
    let mut board = Board::new(ViewStore::new(), log.clone());

    poller::refresh_once(&source, &mut board, &log);

    assert!(board.store().metrics().is_none());
    assert_eq!(board.store().full_set().len(), 2);
    assert_eq!(board.store().filtered_set().len(), 1);
}

#[test]
fn metrics_failure_keeps_previous_metrics_while_loads_update() {
    let source = StaticDataSource::new(Some(metrics(4)), Some(vec![raw("A", "available")]));
    let log = ActivityLog::disabled();
    let mut board = Board::new(ViewStore::new(), log.clone());
    poller::refresh_once(&source, &mut board, &log);
    assert_eq!(board.store().metrics().map(|m| m.total_calls), Some(4));

    source.set_metrics(None);
    source.set_loads(Some(vec![raw("B", "available"), raw("C", "available")]));
    poller::refresh_once(&source, &mut board, &log);

    assert_eq!(board.store().metrics().map(|m| m.total_calls), Some(4));
    let ids: Vec<&str> = board.store().full_set().iter().map(|l| l.load_id.as_str()).collect();
    assert_eq!(ids, ["B", "C"]);
}

#[test]
fn loads_failure_keeps_previous_set_while_metrics_update() {
    let source = StaticDataSource::new(Some(metrics(1)), Some(vec![raw("A", "available")]));
    let log = ActivityLog::disabled();
    let mut board = Board::new(ViewStore::new(), log.clone());
    poller::refresh_once(&source, &mut board, &log);

    source.set_loads(None);
    source.set_metrics(Some(metrics(2)));
    poller::refresh_once(&source, &mut board, &log);

    assert_eq!(board.store().full_set().len(), 1);
    assert_eq!(board.store().metrics().map(|m| m.total_calls), Some(2));
}

#[test]
fn every_applied_outcome_is_rendered() {
    let source = StaticDataSource::sample();
    let log = ActivityLog::disabled();
    let recorder = Recorder::default();
    let mut board = Board::new(ViewStore::new(), log.clone()).with_renderer(recorder.clone());

    poller::refresh_once(&source, &mut board, &log);

    assert_eq!(recorder.count(), 2);
    let last = recorder.last().unwrap();
    assert_eq!(last.total_loads(), 5);
    assert!(last.metrics.is_some());
}

#[test]
fn fetch_failures_are_logged_with_kind() {
    let path = std::env::temp_dir().join(format!("loadwatch-poller-log-{}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let log = ActivityLog::to_file(&path, Level::Info);
    let source = StaticDataSource::new(None, Some(vec![raw("A", "booked")]));
    let mut board = Board::new(ViewStore::new(), log.clone());

    poller::refresh_once(&source, &mut board, &log);

    let entries = read_entries(&path);
    let failure = entries.iter().find(|e| e.event == "fetch_failed").unwrap();
    assert_eq!(failure.level, Level::Warn);
    assert!(failure.detail.contains("http_status"));
    let applied = entries.iter().find(|e| e.event == "loads_applied").unwrap();
    assert_eq!(applied.detail, "1 loads, 1 booked");
}

// ---------------------------------------------------------------------------
// Poller with a manual clock
// ---------------------------------------------------------------------------

#[test]
fn guard_suppresses_tick_after_manual_refresh() {
    let (tx, rx) = mpsc::channel();
    let clock = ManualClock::new();
    let source = Arc::new(StaticDataSource::sample());
    let mut poller = Poller::new(
        source.clone(),
        clock.clone(),
        &refresh(15_000, 1_000),
        ActivityLog::disabled(),
        tx,
    );

    // startup cycle
    assert_eq!(poller.refresh_cycle(), 1);

    // manual refresh at t = 12s
    clock.advance(Duration::from_secs(12));
    assert_eq!(poller.refresh_cycle(), 2);

    // timer tick at t = 15s: only 3s since the last cycle began
    clock.advance(Duration::from_secs(3));
    assert_eq!(poller.tick(), None);

    // timer tick at t = 30s
    clock.advance(Duration::from_secs(15));
    assert_eq!(poller.tick(), Some(3));

    let mut board = Board::new(ViewStore::new(), ActivityLog::disabled());
    for _ in 0..6 {
        board.handle(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }
    assert_eq!(source.metrics_calls(), 3);
    assert_eq!(source.loads_calls(), 3);
    assert_eq!(board.store().full_set().len(), 5);
}

#[test]
fn outcomes_of_one_cycle_arrive_independently() {
    let (tx, rx) = mpsc::channel();
    let source = Arc::new(StaticDataSource::new(None, Some(vec![raw("A", "available")])));
    let mut poller = Poller::new(
        source,
        ManualClock::new(),
        &refresh(15_000, 1_000),
        ActivityLog::disabled(),
        tx,
    );
    poller.refresh_cycle();

    let events: Vec<Event> = (0..2)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert!(events.iter().any(|e| matches!(e, Event::Metrics { metrics: None, .. })));
    assert!(events.iter().any(|e| matches!(e, Event::Loads { loads, .. } if loads.len() == 1)));
}

// ---------------------------------------------------------------------------
// Running control thread
// ---------------------------------------------------------------------------

fn wait_until(shared: &SharedSnapshot, done: impl Fn(&Snapshot) -> bool) -> Snapshot {
    for _ in 0..200 {
        let snapshot = shared.latest();
        if done(&snapshot) {
            return snapshot;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached");
}

#[test]
fn running_poller_publishes_and_accepts_commands() {
    let source = Arc::new(StaticDataSource::sample());
    let log = ActivityLog::disabled();
    let shared = SharedSnapshot::new();
    let board = Board::new(ViewStore::new(), log.clone()).with_renderer(shared.clone());
    let handle = poller::start(source.clone(), &refresh(60_000, 1_000), board, log).unwrap();

    let first = wait_until(&shared, |s| s.total_loads() == 5 && s.metrics.is_some());
    assert_eq!(first.filtered.len(), 3);

    let snapshot = handle
        .request(Command::SetFilter(FilterParam::Tab(Tab::Booked)))
        .unwrap();
    assert_eq!(snapshot.filtered.len(), 2);

    let snapshot = handle.request(Command::Select(Some("LOAD-002".to_string()))).unwrap();
    assert_eq!(snapshot.selected.map(|l| l.load_id), Some("LOAD-002".to_string()));

    assert!(handle.refresh_now());
    for _ in 0..200 {
        if source.loads_calls() >= 2 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(source.loads_calls() >= 2);

    let board = handle.stop().unwrap();
    assert_eq!(board.store().params().tab, Tab::Booked);
}

#[test]
fn client_fails_after_stop() {
    let source = Arc::new(StaticDataSource::sample());
    let log = ActivityLog::disabled();
    let board = Board::new(ViewStore::new(), log.clone());
    let handle = poller::start(source, &refresh(60_000, 1_000), board, log).unwrap();
    let client = handle.client();

    assert!(handle.stop().is_some());
    assert!(client.request(Command::Snapshot).is_none());
    assert!(!client.refresh_now());
}

// ---------------------------------------------------------------------------
// Timer of the running control thread
// ---------------------------------------------------------------------------

fn wait_for_calls(source: &StaticDataSource, at_least: usize, within: Duration) -> usize {
    let deadline = std::time::Instant::now() + within;
    while std::time::Instant::now() < deadline {
        if source.loads_calls() >= at_least {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    source.loads_calls()
}

#[test]
fn timer_starts_cycles_every_interval() {
    let source = Arc::new(StaticDataSource::sample());
    let log = ActivityLog::disabled();
    let board = Board::new(ViewStore::new(), log.clone());
    let handle = poller::start(source.clone(), &refresh(100, 20), board, log).unwrap();

    // startup cycle plus at least three ticks
    assert!(wait_for_calls(&source, 4, Duration::from_secs(5)) >= 4);
    assert!(source.metrics_calls() >= 3);

    handle.stop().unwrap();
}

#[test]
fn manual_refresh_suppresses_the_next_tick() {
    let source = Arc::new(StaticDataSource::sample());
    let log = ActivityLog::disabled();
    let board = Board::new(ViewStore::new(), log.clone());
    // ticks at 1s, 2s, ...; a tick needs 800ms since the last cycle began
    let handle = poller::start(source.clone(), &refresh(1_000, 200), board, log).unwrap();
    assert_eq!(wait_for_calls(&source, 1, Duration::from_secs(2)), 1);

    thread::sleep(Duration::from_millis(500));
    assert!(handle.refresh_now());
    assert_eq!(wait_for_calls(&source, 2, Duration::from_secs(2)), 2);

    // the 1s tick lands about 500ms after the manual cycle and is skipped
    thread::sleep(Duration::from_millis(900));
    assert_eq!(source.loads_calls(), 2);

    // the 2s tick runs
    assert_eq!(wait_for_calls(&source, 3, Duration::from_secs(2)), 3);

    handle.stop().unwrap();
}

#[test]
fn wait_returns_after_client_stop() {
    let source = Arc::new(StaticDataSource::sample());
    let log = ActivityLog::disabled();
    let board = Board::new(ViewStore::new(), log.clone());
    let handle = poller::start(source, &refresh(60_000, 1_000), board, log).unwrap();
    let client = handle.client();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        client.stop()
    });

    assert!(handle.wait().is_some());
    assert!(stopper.join().unwrap());
}
