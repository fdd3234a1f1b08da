/// Configuration system for loadwatch.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**, from [`schema::LoadwatchConfig::default()`]
/// 2. **User global config**, `~/.loadwatch/config.toml`
/// 3. **Project local config**, `.loadwatch.toml` in the current directory
/// 4. **Environment variables**, `LOADWATCH_*` overrides (highest precedence)
///
/// File layers are merged key by key: a project file that only sets
/// `refresh.interval_ms` keeps everything else from the global file.
///
/// # Usage
///
/// ```rust,ignore
/// let cfg = loadwatch::config::load();
/// let source = HttpDataSource::from_config(&cfg.api);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::LoadwatchConfig;

use crate::filter::Tab;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars. Unreadable or
/// malformed files are skipped so a bad file never stops the board.
pub fn load() -> LoadwatchConfig {
    let files = [global_config_path(), project_config_path()];
    let mut config = load_from_files(files.iter().flatten().map(PathBuf::as_path));
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Merge the given TOML files, in order, over the built-in defaults.
pub fn load_from_files<'a>(paths: impl IntoIterator<Item = &'a Path>) -> LoadwatchConfig {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    for path in paths {
        if let Some(layer) = load_toml_value(path) {
            merge_values(&mut merged, layer);
        }
    }

    merged.try_into().unwrap_or_default()
}

/// Read a TOML file as an untyped value, if present and well formed.
fn load_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    // Reject files that parse as TOML but not as our schema.
    let _: LoadwatchConfig = value.clone().try_into().ok()?;
    Some(value)
}

/// Recursively overlay `overlay` onto `base`. Tables merge; anything else
/// replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.loadwatch/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".loadwatch").join("config.toml"))
}

/// Path to the project local config: `.loadwatch.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".loadwatch.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> Option<PathBuf> {
    if path == "~" {
        return dirs::home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `LOADWATCH_API_URL`: backend base URL
/// - `LOADWATCH_API_KEY`: bearer credential
/// - `LOADWATCH_TIMEOUT_MS`: per-request timeout
/// - `LOADWATCH_REFRESH_INTERVAL_MS`: poll period
/// - `LOADWATCH_REFRESH_GUARD_MS`: debounce guard
/// - `LOADWATCH_TAB`: initial tab (`available`, `booked`, `all`)
/// - `LOADWATCH_WEB_ADDR`: dashboard bind address
/// - `LOADWATCH_LOG_LEVEL`: activity log level
/// - `LOADWATCH_LOG`: activity log on/off
///
/// `lookup` abstracts `std::env::var` so tests need not touch the process
/// environment.
pub fn apply_env_overrides(config: &mut LoadwatchConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("LOADWATCH_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = val.trim_end_matches('/').to_string();
    }
    if let Some(val) = lookup("LOADWATCH_API_KEY")
        && !val.is_empty()
    {
        config.api.api_key = val;
    }
    if let Some(val) = lookup("LOADWATCH_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Some(val) = lookup("LOADWATCH_REFRESH_INTERVAL_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.refresh.interval_ms = ms;
    }
    if let Some(val) = lookup("LOADWATCH_REFRESH_GUARD_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.refresh.guard_ms = ms;
    }
    if let Some(val) = lookup("LOADWATCH_TAB")
        && let Some(tab) = Tab::parse(&val)
    {
        config.filters.tab = tab;
    }
    if let Some(val) = lookup("LOADWATCH_WEB_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Some(val) = lookup("LOADWATCH_LOG_LEVEL")
        && !val.is_empty()
    {
        config.logging.level = val.to_ascii_lowercase();
    }
    if let Some(val) = lookup("LOADWATCH_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.loadwatch/config.toml`.
///
/// Fails if the file exists, unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.loadwatch/ directory")?;
    }

    fs::write(&path, LoadwatchConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a dotted key (e.g. `refresh.interval_ms`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)?;
    Ok(path)
}

/// Set a dotted key in the config file at `path`, creating it from the
/// defaults if it does not exist. The existing value's type decides how
/// `value` is parsed.
pub fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&LoadwatchConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;

    // Keys missing from a sparse file are resolved against the full schema.
    let defaults = toml::Value::try_from(LoadwatchConfig::default())
        .context("failed to serialize default config")?;
    let mut full = defaults;
    merge_values(&mut full, root.clone());
    set_toml_value(&mut full, key, value)?;

    let leaf_value = lookup_value(&full, key).cloned();
    if let Some(leaf_value) = leaf_value {
        insert_dotted(&mut root, key, leaf_value)?;
    }

    // The edited file must still load.
    root.clone()
        .try_into::<LoadwatchConfig>()
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let (parents, leaf) = match key.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        anyhow::bail!("empty config key");
    }

    let mut current = root;
    for part in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{}'", parents.unwrap_or("")))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

fn lookup_value<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.').try_fold(root, |node, part| node.get(part))
}

/// Insert `value` at a dotted key, creating intermediate tables.
fn insert_dotted(root: &mut toml::Value, key: &str, value: toml::Value) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let (leaf, parents) = parts.split_last().context("empty config key")?;

    let mut current = root;
    for part in parents {
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{key}'"))?;
        current = table
            .entry(part.to_string())
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    current
        .as_table_mut()
        .with_context(|| format!("expected table above '{key}'"))?
        .insert(leaf.to_string(), value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "loadwatch-config-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn is_truthy_accepts_variants() {
        for yes in ["1", "true", "TRUE", "yes", "on", "ON"] {
            assert!(is_truthy(yes), "{yes}");
        }
        for no in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(no), "{no}");
        }
    }

    #[test]
    fn later_files_override_earlier_keys_only() {
        let dir = temp_dir("layers");
        let global = dir.join("global.toml");
        let project = dir.join("project.toml");
        fs::write(
            &global,
            "[api]\nbase_url = \"http://broker:8000\"\n[refresh]\ninterval_ms = 30000\n",
        )
        .unwrap();
        fs::write(&project, "[refresh]\nguard_ms = 500\n").unwrap();

        let config = load_from_files([global.as_path(), project.as_path()]);
        assert_eq!(config.api.base_url, "http://broker:8000");
        assert_eq!(config.refresh.interval_ms, 30_000);
        assert_eq!(config.refresh.guard_ms, 500);
    }

    #[test]
    fn malformed_file_is_skipped() {
        let dir = temp_dir("malformed");
        let bad = dir.join("bad.toml");
        fs::write(&bad, "[refresh\ninterval_ms = ").unwrap();
        let wrong_type = dir.join("wrong.toml");
        fs::write(&wrong_type, "[refresh]\ninterval_ms = \"soon\"\n").unwrap();

        let config = load_from_files([bad.as_path(), wrong_type.as_path()]);
        assert_eq!(config.refresh.interval_ms, 15_000);
    }

    #[test]
    fn missing_files_yield_defaults() {
        let dir = temp_dir("missing");
        let config = load_from_files([dir.join("nope.toml").as_path()]);
        assert_eq!(config.api.timeout_ms, 10_000);
    }

    #[test]
    fn env_overrides_win() {
        let mut config = LoadwatchConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            "LOADWATCH_API_URL" => Some("http://api.example.com/".to_string()),
            "LOADWATCH_API_KEY" => Some("secret".to_string()),
            "LOADWATCH_REFRESH_INTERVAL_MS" => Some("5000".to_string()),
            "LOADWATCH_REFRESH_GUARD_MS" => Some("not-a-number".to_string()),
            "LOADWATCH_TAB" => Some("booked".to_string()),
            "LOADWATCH_LOG" => Some("off".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://api.example.com");
        assert_eq!(config.api.api_key, "secret");
        assert_eq!(config.refresh.interval_ms, 5000);
        assert_eq!(config.refresh.guard_ms, 1000);
        assert_eq!(config.filters.tab, Tab::Booked);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn set_toml_value_keeps_integer_type() {
        let mut root: toml::Value = toml::from_str("[refresh]\ninterval_ms = 100\n").unwrap();
        set_toml_value(&mut root, "refresh.interval_ms", "50").unwrap();
        assert_eq!(root["refresh"]["interval_ms"].as_integer(), Some(50));
        assert!(set_toml_value(&mut root, "refresh.interval_ms", "fast").is_err());
    }

    #[test]
    fn set_toml_value_rejects_unknown_key() {
        let mut root: toml::Value = toml::from_str("[refresh]\ninterval_ms = 100\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "refresh.bogus", "1").is_err());
    }

    #[test]
    fn set_config_value_at_writes_sparse_file() {
        let dir = temp_dir("set");
        let path = dir.join("config.toml");
        fs::write(&path, "[api]\napi_key = \"abc\"\n").unwrap();

        set_config_value_at(&path, "refresh.guard_ms", "250").unwrap();
        set_config_value_at(&path, "web.open_browser", "no").unwrap();

        let config = load_from_files([path.as_path()]);
        assert_eq!(config.api.api_key, "abc");
        assert_eq!(config.refresh.guard_ms, 250);
        assert!(!config.web.open_browser);
    }

    #[test]
    fn set_config_value_at_rejects_invalid_tab() {
        let dir = temp_dir("tab");
        let path = dir.join("config.toml");
        assert!(set_config_value_at(&path, "filters.tab", "covered").is_err());
        set_config_value_at(&path, "filters.tab", "all").unwrap();
        assert_eq!(load_from_files([path.as_path()]).filters.tab, Tab::All);
    }

    #[test]
    fn expand_home_handles_tilde() {
        let expanded = expand_home("~/.loadwatch/activity.jsonl").unwrap();
        assert!(expanded.ends_with(".loadwatch/activity.jsonl"));
        assert_eq!(expand_home("/tmp/x.jsonl"), Some(PathBuf::from("/tmp/x.jsonl")));
    }
}
