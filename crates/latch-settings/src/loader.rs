//! Settings loading and directory resolution.
//!
//! Loading flow:
//! 1. Start with compiled [`LatchSettings::default()`]
//! 2. If `~/.latch/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `LATCH_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::LatchSettings;

/// Name of the per-user configuration folder under `$HOME`.
pub const CONFIG_FOLDER_NAME: &str = ".latch";

const SETTINGS_FILE_NAME: &str = "settings.json";
const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Path to the settings file (`~/.latch/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join(CONFIG_FOLDER_NAME)
        .join(SETTINGS_FILE_NAME)
}

/// Path to the credentials document inside a config directory.
pub fn credentials_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CREDENTIALS_FILE_NAME)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LatchSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<LatchSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<LatchSettings> {
    let defaults = serde_json::to_value(LatchSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, everything else is replaced by `source`, and null
/// values in `source` leave `target` untouched.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `LATCH_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut LatchSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning so a typo in the environment
/// never prevents startup.
pub fn apply_overrides_from<F>(settings: &mut LatchSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = string("LATCH_CONFIG_DIR") {
        settings.config_dir = Some(v);
    }
    if let Some(v) = string("LATCH_API_HOST") {
        settings.api_host = Some(v);
    }
    if let Some(v) = string("LATCH_DEV") {
        match parse_bool(&v) {
            Some(b) => settings.dev_mode = b,
            None => warn_invalid("LATCH_DEV", &v),
        }
    }
    if let Some(v) = string("LATCH_REFRESH_BUFFER_SECS") {
        match parse_u64_range(&v, 0, 86_400) {
            Some(n) => settings.auth.refresh_buffer_seconds = n,
            None => warn_invalid("LATCH_REFRESH_BUFFER_SECS", &v),
        }
    }
    if let Some(v) = string("LATCH_LOCK_TIMEOUT_MS") {
        match parse_u64_range(&v, 0, 600_000) {
            Some(n) => settings.auth.lock_timeout_ms = n,
            None => warn_invalid("LATCH_LOCK_TIMEOUT_MS", &v),
        }
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!(key, value, "invalid env var, ignoring");
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Resolve the configuration directory using `$HOME`.
pub fn config_dir(settings: &LatchSettings) -> Result<PathBuf> {
    let home = std::env::var("HOME").ok();
    config_dir_with_home(settings, home.as_deref())
}

/// Resolve the configuration directory against an explicit home directory.
///
/// A custom directory must already exist. The default `<home>/.latch` is
/// created (mode 0755) on first use.
pub fn config_dir_with_home(settings: &LatchSettings, home: Option<&str>) -> Result<PathBuf> {
    if let Some(custom) = settings.config_dir.as_deref().filter(|d| !d.is_empty()) {
        let dir = PathBuf::from(custom);
        if !dir.is_dir() {
            return Err(SettingsError::ConfigDirMissing(dir));
        }
        return Ok(dir);
    }

    let home = home
        .filter(|h| !h.is_empty())
        .ok_or(SettingsError::HomeDirectoryUnavailable)?;
    let dir = Path::new(home).join(CONFIG_FOLDER_NAME);
    if !dir.exists() {
        debug!(?dir, "creating config directory");
        create_config_dir(&dir)?;
    }
    Ok(dir)
}

fn create_config_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    let _ = builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        let _ = builder.mode(0o755);
    }
    builder.create(dir)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
