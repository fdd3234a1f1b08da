//! Activity log: one JSON line per poller event.
//!
//! Entries go to `~/.loadwatch/activity.jsonl` by default. Writing is
//! best-effort: an unwritable log never interrupts a refresh cycle.
//! Warnings and errors are optionally echoed to stderr.
//!
//! Read back by `loadwatch health` to report recent fetch failures.

use std::fmt;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::expand_home;
use crate::config::schema::LoggingConfig;

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A single line in the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: String,
    pub level: Level,
    /// Short machine-friendly event name, e.g. `"fetch_failed"`.
    pub event: String,
    pub detail: String,
    /// Refresh cycle the event belongs to, when there is one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cycle: Option<u64>,
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Cheap-to-clone handle on the activity log.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: Option<PathBuf>,
    min_level: Level,
    echo_stderr: bool,
}

impl ActivityLog {
    pub fn from_config(config: &LoggingConfig) -> Self {
        let path = if config.enabled {
            expand_home(&config.path)
        } else {
            None
        };
        Self {
            path,
            min_level: Level::parse(&config.level).unwrap_or(Level::Info),
            echo_stderr: config.stderr,
        }
    }

    /// Logger that records nothing and prints nothing.
    pub fn disabled() -> Self {
        Self {
            path: None,
            min_level: Level::Error,
            echo_stderr: false,
        }
    }

    /// Logger writing to an explicit file.
    pub fn to_file(path: impl Into<PathBuf>, min_level: Level) -> Self {
        Self {
            path: Some(path.into()),
            min_level,
            echo_stderr: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn debug(&self, event: &str, detail: impl Into<String>, cycle: Option<u64>) {
        self.record(Level::Debug, event, detail.into(), cycle);
    }

    pub fn info(&self, event: &str, detail: impl Into<String>, cycle: Option<u64>) {
        self.record(Level::Info, event, detail.into(), cycle);
    }

    pub fn warn(&self, event: &str, detail: impl Into<String>, cycle: Option<u64>) {
        self.record(Level::Warn, event, detail.into(), cycle);
    }

    pub fn error(&self, event: &str, detail: impl Into<String>, cycle: Option<u64>) {
        self.record(Level::Error, event, detail.into(), cycle);
    }

    fn record(&self, level: Level, event: &str, detail: String, cycle: Option<u64>) {
        if level < self.min_level {
            return;
        }

        if self.echo_stderr && level >= Level::Warn {
            eprintln!("loadwatch: {level}: {event}: {detail}");
        }

        let Some(path) = &self.path else {
            return;
        };

        let entry = ActivityEntry {
            timestamp: Utc::now().to_rfc3339(),
            level,
            event: event.to_string(),
            detail,
            cycle,
        };
        let _ = append_entry(path, &entry);
    }

    /// Read the last `limit` entries at or above `level`.
    pub fn recent(&self, level: Level, limit: usize) -> Vec<ActivityEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let mut entries: Vec<ActivityEntry> = read_entries(path)
            .into_iter()
            .filter(|e| e.level >= level)
            .collect();
        let excess = entries.len().saturating_sub(limit);
        entries.drain(..excess);
        entries
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_entry(path: &Path, entry: &ActivityEntry) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Read all entries, silently skipping malformed lines.
pub fn read_entries(path: &Path) -> Vec<ActivityEntry> {
    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<ActivityEntry>(&line).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
