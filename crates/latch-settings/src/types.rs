//! Settings type definitions.
//!
//! All types use camelCase field names on disk and `#[serde(default)]` so a
//! partial settings file only overrides what it names.

use serde::{Deserialize, Serialize};

/// Root settings for latch.
///
/// ```json
/// {
///   "apiHost": "https://dev1234.slack.com",
///   "devMode": true,
///   "auth": { "refreshBufferSeconds": 600 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LatchSettings {
    /// Custom configuration directory. Must already exist when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<String>,
    /// Explicit API host override. Wins over every other host source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    /// Target the development endpoint instead of production.
    pub dev_mode: bool,
    /// Credential handling.
    pub auth: AuthSettings,
}

/// Credential rotation and persistence settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// Rotate a token once it is this close to expiring.
    pub refresh_buffer_seconds: u64,
    /// How long to wait for the credentials file lock.
    pub lock_timeout_ms: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_buffer_seconds: 300,
            lock_timeout_ms: 10_000,
        }
    }
}
