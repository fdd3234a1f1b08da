/// Configuration schema and defaults for loadwatch.
///
/// Defines the TOML-serializable configuration structure with all sections:
/// `[api]`, `[refresh]`, `[filters]`, `[web]`, and `[logging]`.
///
/// Every field has a built-in default. Users only need to set the values
/// they want to override.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::{FilterParams, Tab};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level loadwatch configuration.
///
/// Maps directly to `~/.loadwatch/config.toml` and `.loadwatch.toml`. All
/// sections and fields are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadwatchConfig {
    pub api: ApiConfig,
    pub refresh: RefreshConfig,
    pub filters: FiltersConfig,
    pub web: WebConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend base URL, without a trailing slash.
    pub base_url: String,
    /// Static bearer credential attached to every request.
    pub api_key: String,
    /// Per-request timeout (milliseconds).
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_key: "acme_dev_test_key_123".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// [refresh]
// ---------------------------------------------------------------------------

/// Poll timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Timer period between refresh ticks (milliseconds).
    pub interval_ms: u64,
    /// A tick only starts a cycle if at least `interval_ms - guard_ms`
    /// has passed since the previous cycle began.
    pub guard_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: 15_000,
            guard_ms: 1_000,
        }
    }
}

/// Floor for `interval_ms`; a zero period would spin the control thread.
pub const MIN_INTERVAL_MS: u64 = 100;

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn guard(&self) -> Duration {
        Duration::from_millis(self.guard_ms)
    }
}

// ---------------------------------------------------------------------------
// [filters]
// ---------------------------------------------------------------------------

/// Filter parameters the board starts with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    pub tab: Tab,
    pub equipment_type: String,
    pub search: String,
}

impl FiltersConfig {
    pub fn to_params(&self) -> FilterParams {
        FilterParams::new(self.tab, self.equipment_type.clone(), self.search.clone())
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Embedded dashboard server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address for `loadwatch serve`.
    pub addr: String,
    /// Open the dashboard in the default browser on start.
    pub open_browser: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9850".to_string(),
            open_browser: true,
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

/// Activity log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether the activity log is written at all.
    pub enabled: bool,
    /// Path to the JSONL activity log. `~` is expanded to the home directory.
    pub path: String,
    /// Minimum level recorded: `"debug"`, `"info"`, `"warn"`, `"error"`.
    pub level: String,
    /// Echo warnings and errors to stderr.
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.loadwatch/activity.jsonl".to_string(),
            level: "info".to_string(),
            stderr: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Annotated default file
// ---------------------------------------------------------------------------

impl LoadwatchConfig {
    /// The annotated TOML written by `loadwatch config init`.
    pub fn default_toml() -> String {
        r#"# loadwatch configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (LOADWATCH_*)
#   2. Project config (.loadwatch.toml in current directory)
#   3. User global config (~/.loadwatch/config.toml)
#   4. Built-in defaults

[api]
base_url = "http://localhost:8000"
api_key = "acme_dev_test_key_123"   # or LOADWATCH_API_KEY
timeout_ms = 10000

[refresh]
interval_ms = 15000   # timer period
guard_ms = 1000       # ticks closer than interval - guard to the last cycle are skipped

[filters]
tab = "available"     # available | booked | all
equipment_type = ""   # exact match, empty = any
search = ""

[web]
addr = "127.0.0.1:9850"
open_browser = true

[logging]
enabled = true
path = "~/.loadwatch/activity.jsonl"
level = "info"        # debug | info | warn | error
stderr = true
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
