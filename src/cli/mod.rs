//! CLI command implementations for loadwatch.
//!
//! Provides subcommand handlers for:
//! - `loadwatch watch`: poll and redraw the load board in the terminal
//! - `loadwatch serve`: poll and serve the web dashboard
//! - `loadwatch loads|show|calls|metrics`: one refresh cycle, then print
//! - `loadwatch health`: config, backend reachability, activity log
//! - `loadwatch config show|init|set|reset`: configuration management

use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::activity::{ActivityLog, Level};
use crate::api::{DataSource, HttpDataSource, StaticDataSource};
use crate::board::{Board, Command};
use crate::config::{self, schema::LoadwatchConfig};
use crate::filter::{FilterParam, FilterParams, Tab};
use crate::poller::{self, PollerClient, PollerHandle};
use crate::render::terminal::{self, TerminalRenderer};
use crate::render::SharedSnapshot;
use crate::store::ViewStore;
use crate::web::{self, WebState};

/// Output format for the one-shot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Filter flags shared by `watch` and `loads`. Unset flags keep the
/// configured default.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub tab: Option<String>,
    pub equipment: Option<String>,
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn resolve(&self, cfg: &LoadwatchConfig) -> Result<FilterParams> {
        let mut params = cfg.filters.to_params();
        if let Some(tab) = &self.tab {
            let Some(tab) = Tab::parse(tab) else {
                bail!("unknown tab '{tab}' (expected available, booked or all)");
            };
            params.set(FilterParam::Tab(tab));
        }
        if let Some(equipment) = &self.equipment {
            params.set(FilterParam::Equipment(equipment.clone()));
        }
        if let Some(search) = &self.search {
            params.set(FilterParam::Search(search.clone()));
        }
        Ok(params)
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

fn data_source(cfg: &LoadwatchConfig, demo: bool) -> Arc<dyn DataSource> {
    if demo {
        Arc::new(StaticDataSource::sample())
    } else {
        Arc::new(HttpDataSource::from_config(&cfg.api))
    }
}

/// Run one refresh cycle and return the resulting board.
fn fetch_board(cfg: &LoadwatchConfig, params: FilterParams, demo: bool) -> Board {
    let log = ActivityLog::from_config(&cfg.logging);
    let source = data_source(cfg, demo);
    let mut board = Board::new(ViewStore::with_params(params), log.clone());
    poller::refresh_once(source.as_ref(), &mut board, &log);

    if board.store().full_set().is_empty() {
        println!(
            "{}",
            format!("No loads received from {}.", source_label(cfg, demo)).yellow()
        );
    }
    board
}

fn source_label(cfg: &LoadwatchConfig, demo: bool) -> String {
    if demo {
        "the demo data source".to_string()
    } else {
        cfg.api.base_url.clone()
    }
}

// ---------------------------------------------------------------------------
// loadwatch watch
// ---------------------------------------------------------------------------

/// Poll and redraw the board until `q` or Ctrl+C.
///
/// Reads simple commands from stdin while running:
/// `r` refresh, `t <tab>`, `e <equipment>`, `/<text>` search,
/// `s <load_id>` select, `s` clear selection, `q` quit. Once stdin is
/// closed the board keeps refreshing until the process is interrupted.
pub fn run_watch(cfg: &LoadwatchConfig, filters: &FilterArgs, demo: bool) -> Result<()> {
    let params = filters.resolve(cfg)?;
    let log = ActivityLog::from_config(&cfg.logging);
    let board = Board::new(ViewStore::with_params(params), log.clone())
        .with_renderer(TerminalRenderer::new(true));

    let handle = poller::start(data_source(cfg, demo), &cfg.refresh, board, log)?;

    match read_watch_input(std::io::stdin().lock(), &handle.client())? {
        WatchExit::Quit => stop(handle),
        WatchExit::EndOfInput => {
            if handle.wait().is_none() {
                eprintln!("{}", "control thread exited abnormally".red());
            }
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum WatchExit {
    Quit,
    EndOfInput,
}

/// Forward watch commands from `input` to the control thread.
fn read_watch_input(input: impl BufRead, client: &PollerClient) -> Result<WatchExit> {
    for line in input.lines() {
        let line = line.context("failed to read stdin")?;
        match parse_watch_input(&line) {
            Some(WatchInput::Quit) => return Ok(WatchExit::Quit),
            Some(WatchInput::Refresh) => {
                client.refresh_now();
            }
            Some(WatchInput::Command(command)) => {
                client.send(command);
            }
            None if line.trim().is_empty() => {}
            None => println!("{}", format!("unrecognized input: {line}").yellow()),
        }
    }
    Ok(WatchExit::EndOfInput)
}

#[derive(Debug, PartialEq)]
enum WatchInput {
    Quit,
    Refresh,
    Command(Command),
}

fn parse_watch_input(line: &str) -> Option<WatchInput> {
    let line = line.trim();
    if let Some(query) = line.strip_prefix('/') {
        return Some(WatchInput::Command(Command::SetFilter(FilterParam::Search(
            query.trim().to_string(),
        ))));
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "q" | "quit" => Some(WatchInput::Quit),
        "r" | "refresh" => Some(WatchInput::Refresh),
        "t" | "tab" => Tab::parse(rest).map(|tab| WatchInput::Command(Command::SetFilter(FilterParam::Tab(tab)))),
        "e" | "equipment" => Some(WatchInput::Command(Command::SetFilter(FilterParam::Equipment(
            rest.to_string(),
        )))),
        "s" | "select" => {
            let id = (!rest.is_empty()).then(|| rest.to_string());
            Some(WatchInput::Command(Command::Select(id)))
        }
        _ => None,
    }
}

fn stop(handle: PollerHandle) {
    if handle.stop().is_none() {
        eprintln!("{}", "control thread exited abnormally".red());
    }
}

// ---------------------------------------------------------------------------
// loadwatch serve
// ---------------------------------------------------------------------------

/// Poll in the background and serve the web dashboard. Blocks.
pub fn run_serve(cfg: &LoadwatchConfig, addr: Option<&str>, demo: bool) -> Result<()> {
    let log = ActivityLog::from_config(&cfg.logging);
    let shared = SharedSnapshot::new();
    let board = Board::new(ViewStore::with_params(cfg.filters.to_params()), log.clone())
        .with_renderer(shared.clone());

    let handle = poller::start(data_source(cfg, demo), &cfg.refresh, board, log.clone())?;

    let state = WebState {
        snapshot: shared,
        client: handle.client(),
        config: cfg.clone(),
        log,
        started_at: Instant::now(),
    };
    let addr = addr.unwrap_or(cfg.web.addr.as_str());
    let result = web::serve(addr, &state);

    stop(handle);
    result
}

// ---------------------------------------------------------------------------
// loadwatch loads | show | calls | metrics
// ---------------------------------------------------------------------------

/// Print the filtered loads after one refresh cycle.
pub fn run_loads(cfg: &LoadwatchConfig, filters: &FilterArgs, format: OutputFormat, demo: bool) -> Result<()> {
    let params = filters.resolve(cfg)?;
    let board = fetch_board(cfg, params, demo);
    let store = board.store();
    terminal::print_loads(store.filtered_set(), store.full_set().len(), store.params(), format)
}

/// Print the details of one load.
pub fn run_show(cfg: &LoadwatchConfig, load_id: &str, demo: bool) -> Result<()> {
    let board = fetch_board(cfg, cfg.filters.to_params(), demo);
    let Some(load) = board.store().lookup(load_id) else {
        bail!("load '{load_id}' not found");
    };
    terminal::print_load_details(load);
    Ok(())
}

/// Print recent calls with their routes.
pub fn run_calls(cfg: &LoadwatchConfig, format: OutputFormat, demo: bool) -> Result<()> {
    let board = fetch_board(cfg, cfg.filters.to_params(), demo);
    let snapshot = board.snapshot();
    if snapshot.metrics.is_none() {
        println!("{}", "Metrics unavailable.".yellow());
        return Ok(());
    }
    terminal::print_calls(&snapshot.call_rows(), format)
}

/// Print KPIs and breakdown charts.
pub fn run_metrics(cfg: &LoadwatchConfig, format: OutputFormat, demo: bool) -> Result<()> {
    let board = fetch_board(cfg, cfg.filters.to_params(), demo);
    match board.store().metrics() {
        Some(metrics) => terminal::print_metrics(metrics, format),
        None => {
            println!("{}", "Metrics unavailable.".yellow());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// loadwatch health
// ---------------------------------------------------------------------------

/// Check config files, backend reachability and the activity log.
pub fn run_health() -> Result<()> {
    println!("{}", "loadwatch Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.loadwatch/config.toml found"
        } else {
            "not found (run `loadwatch config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".loadwatch.toml found"
        } else {
            "none (optional)"
        },
    );
    print_health_item(
        "Refresh",
        cfg.refresh.guard_ms < cfg.refresh.interval_ms,
        &format!(
            "every {}ms, guard {}ms",
            cfg.refresh.interval_ms, cfg.refresh.guard_ms
        ),
    );

    let client = HttpDataSource::from_config(&cfg.api);
    match client.health() {
        Ok(_) => print_health_item("Backend", true, &format!("reachable at {}", cfg.api.base_url)),
        Err(e) => print_health_item(
            "Backend",
            false,
            &format!("{} unreachable: {e}", cfg.api.base_url),
        ),
    }

    let log = ActivityLog::from_config(&cfg.logging);
    match log.path() {
        Some(path) if path.exists() => {
            let failures = log.recent(Level::Warn, 5);
            print_health_item(
                "Activity log",
                failures.is_empty(),
                &format!("{} ({} recent warnings)", path.display(), failures.len()),
            );
            for entry in &failures {
                println!(
                    "      {} {} {}",
                    entry.timestamp.dimmed(),
                    entry.event.yellow(),
                    entry.detail
                );
            }
        }
        Some(_) => print_health_item("Activity log", true, "no log file yet"),
        None => print_health_item("Activity log", true, "disabled"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<16} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// loadwatch config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective loadwatch Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source("~/.loadwatch/config.toml", global_exists);
    print_source(".loadwatch.toml", project_exists);
    println!(
        "  {} {}",
        "·".dimmed(),
        "LOADWATCH_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(name: &str, exists: bool) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Write a default config file to `~/.loadwatch/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set one dotted key in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    let path = config::set_config_value(key, value)?;
    println!(
        "{} Set {} = {} in {}",
        "✓".green().bold(),
        key.bold(),
        value,
        path.display()
    );
    Ok(())
}

/// Reset the global config file to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
