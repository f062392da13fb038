//! # latch-settings
//!
//! Layered configuration for latch.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`LatchSettings::default()`]
//! 2. **User file**: `~/.latch/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `LATCH_*` overrides
//!
//! The resolved config directory also holds `credentials.json`, the document
//! managed by `latch-auth`.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, config_dir, config_dir_with_home,
    credentials_path, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::{AuthSettings, LatchSettings};
