//! Refresh scheduling.
//!
//! A refresh cycle starts two independent fetch workers, one for metrics
//! and one for loads. Each worker posts its outcome to the control thread
//! as soon as it finishes; neither waits for the other. Cycles are started
//! once at startup, on every timer tick admitted by the [`RefreshGuard`],
//! and on manual refresh requests.
//!
//! The control thread owns the [`Board`] and is the only writer of view
//! state. Overlapping cycles are allowed; their outcomes are applied in
//! arrival order.

pub mod clock;
pub mod guard;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::RefreshGuard;

use crate::activity::ActivityLog;
use crate::api::{self, DataSource};
use crate::board::{Board, Command, Event};
use crate::config::schema::RefreshConfig;
use crate::store::Snapshot;

/// How long [`PollerHandle::request`] waits for the control thread.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct Poller<C: Clock = SystemClock> {
    source: Arc<dyn DataSource>,
    clock: C,
    interval: Duration,
    guard: RefreshGuard,
    log: ActivityLog,
    events: Sender<Event>,
    cycles: u64,
}

impl<C: Clock> Poller<C> {
    pub fn new(
        source: Arc<dyn DataSource>,
        clock: C,
        config: &RefreshConfig,
        log: ActivityLog,
        events: Sender<Event>,
    ) -> Self {
        Self {
            source,
            clock,
            interval: config.interval(),
            guard: RefreshGuard::new(config.interval(), config.guard()),
            log,
            events,
            cycles: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn guard(&self) -> &RefreshGuard {
        &self.guard
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Start a cycle unconditionally. Returns the cycle number.
    ///
    /// Does not wait for the fetches; their outcomes arrive later as
    /// [`Event::Metrics`] and [`Event::Loads`].
    pub fn refresh_cycle(&mut self) -> u64 {
        self.guard.mark_started(self.clock.now());
        self.cycles += 1;
        let cycle = self.cycles;
        self.log.debug("cycle_started", "", Some(cycle));

        spawn_fetch(
            "loadwatch-metrics",
            Arc::clone(&self.source),
            self.log.clone(),
            self.events.clone(),
            move |source, log| Event::Metrics {
                cycle,
                metrics: api::fetch_metrics(source, log, Some(cycle)),
            },
        );
        spawn_fetch(
            "loadwatch-loads",
            Arc::clone(&self.source),
            self.log.clone(),
            self.events.clone(),
            move |source, log| Event::Loads {
                cycle,
                loads: api::fetch_loads(source, log, Some(cycle)),
            },
        );

        cycle
    }

    /// Timer tick: start a cycle if the guard admits it.
    pub fn tick(&mut self) -> Option<u64> {
        if self.guard.should_run(self.clock.now()) {
            Some(self.refresh_cycle())
        } else {
            self.log.debug("tick_skipped", "previous cycle started too recently", None);
            None
        }
    }
}

fn spawn_fetch<F>(
    name: &str,
    source: Arc<dyn DataSource>,
    log: ActivityLog,
    events: Sender<Event>,
    fetch: F,
) where
    F: FnOnce(&dyn DataSource, &ActivityLog) -> Event + Send + 'static,
{
    let spawned = thread::Builder::new().name(name.to_string()).spawn({
        let log = log.clone();
        move || {
            let event = fetch(source.as_ref(), &log);
            // The control thread may already be gone; the outcome is dropped.
            let _ = events.send(event);
        }
    });
    if let Err(err) = spawned {
        log.error("spawn_failed", format!("{name}: {err}"), None);
    }
}

// ---------------------------------------------------------------------------
// One-shot refresh
// ---------------------------------------------------------------------------

/// Run a single cycle to completion on the calling thread's behalf.
///
/// Both fetches still run concurrently; each outcome is applied to `board`
/// as it arrives. Used by the one-shot CLI commands.
pub fn refresh_once(source: &dyn DataSource, board: &mut Board, log: &ActivityLog) {
    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        let metrics_tx = tx.clone();
        scope.spawn(move || {
            let _ = metrics_tx.send(Event::Metrics {
                cycle: 1,
                metrics: api::fetch_metrics(source, log, Some(1)),
            });
        });
        let loads_tx = tx;
        scope.spawn(move || {
            let _ = loads_tx.send(Event::Loads {
                cycle: 1,
                loads: api::fetch_loads(source, log, Some(1)),
            });
        });

        for event in rx.iter().take(2) {
            board.handle(event);
        }
    });
}

// ---------------------------------------------------------------------------
// Control loop
// ---------------------------------------------------------------------------

/// Start the poller and its control thread.
///
/// The first cycle runs immediately, then the timer ticks every
/// `interval`. Stop it with [`PollerHandle::stop`].
pub fn start(
    source: Arc<dyn DataSource>,
    config: &RefreshConfig,
    board: Board,
    log: ActivityLog,
) -> Result<PollerHandle> {
    let (tx, rx) = mpsc::channel();
    let poller = Poller::new(source, SystemClock, config, log.clone(), tx.clone());
    log.info(
        "poller_started",
        format!(
            "interval {}ms, guard {}ms",
            config.interval_ms, config.guard_ms
        ),
        None,
    );

    let join = thread::Builder::new()
        .name("loadwatch-control".to_string())
        .spawn(move || control_loop(poller, board, rx, log))
        .context("failed to spawn control thread")?;

    Ok(PollerHandle {
        client: PollerClient { events: tx },
        join: Some(join),
    })
}

fn control_loop<C: Clock>(
    mut poller: Poller<C>,
    mut board: Board,
    events: Receiver<Event>,
    log: ActivityLog,
) -> Board {
    board.publish();
    poller.refresh_cycle();

    let interval = poller.interval();
    let mut next_tick = poller.clock.now() + interval;

    loop {
        let wait = next_tick.saturating_duration_since(poller.clock.now());
        match events.recv_timeout(wait) {
            Ok(Event::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Event::RefreshNow) => {
                log.info("manual_refresh", "", None);
                poller.refresh_cycle();
            }
            Ok(event) => board.handle(event),
            Err(RecvTimeoutError::Timeout) => {
                poller.tick();
                next_tick = next_deadline(next_tick, interval, poller.clock.now());
            }
        }
    }

    log.info("poller_stopped", format!("{} cycles", poller.cycles()), None);
    board
}

/// Advance `deadline` by whole intervals until it lies after `now`.
///
/// Ticks missed while the process was suspended are skipped, not replayed.
fn next_deadline(deadline: Instant, interval: Duration, now: Instant) -> Instant {
    if interval.is_zero() {
        return now;
    }
    let mut next = deadline + interval;
    while next <= now {
        next += interval;
    }
    next
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable sender for talking to a running control thread.
#[derive(Debug, Clone)]
pub struct PollerClient {
    events: Sender<Event>,
}

impl PollerClient {
    /// Request an immediate cycle. Bypasses the debounce guard.
    pub fn refresh_now(&self) -> bool {
        self.events.send(Event::RefreshNow).is_ok()
    }

    /// Fire-and-forget command.
    pub fn send(&self, command: Command) -> bool {
        self.events
            .send(Event::Command {
                command,
                reply: None,
            })
            .is_ok()
    }

    /// Ask the control thread to exit.
    pub fn stop(&self) -> bool {
        self.events.send(Event::Stop).is_ok()
    }

    /// Apply a command and wait for the resulting snapshot.
    pub fn request(&self, command: Command) -> Option<Snapshot> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.events
            .send(Event::Command {
                command,
                reply: Some(reply_tx),
            })
            .ok()?;
        reply_rx.recv_timeout(REPLY_TIMEOUT).ok()
    }
}

/// Owner handle for the control thread.
#[derive(Debug)]
pub struct PollerHandle {
    client: PollerClient,
    join: Option<JoinHandle<Board>>,
}

impl PollerHandle {
    pub fn client(&self) -> PollerClient {
        self.client.clone()
    }

    pub fn refresh_now(&self) -> bool {
        self.client.refresh_now()
    }

    pub fn send(&self, command: Command) -> bool {
        self.client.send(command)
    }

    pub fn request(&self, command: Command) -> Option<Snapshot> {
        self.client.request(command)
    }

    /// Stop the timer and wait for the control thread to exit.
    ///
    /// Fetches still in flight finish in the background; their outcomes
    /// are discarded. Returns the board as it was at shutdown.
    pub fn stop(mut self) -> Option<Board> {
        let _ = self.client.events.send(Event::Stop);
        self.join.take()?.join().ok()
    }

    /// Wait for the control thread to exit without asking it to.
    ///
    /// Returns once some [`PollerClient::stop`] call ends the loop.
    pub fn wait(mut self) -> Option<Board> {
        self.join.take()?.join().ok()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.client.events.send(Event::Stop);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
