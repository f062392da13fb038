//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading settings or resolving directories.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file or create a directory.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
    /// `HOME` is unset or empty, so the default config directory is unknown.
    #[error("unable to access the home directory")]
    HomeDirectoryUnavailable,
    /// A custom config directory was configured but does not exist.
    #[error("config directory does not exist: {}", .0.display())]
    ConfigDirMissing(PathBuf),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
