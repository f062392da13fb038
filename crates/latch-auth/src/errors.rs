//! Auth error types.

use std::fmt;
use std::path::PathBuf;

use latch_settings::SettingsError;

/// Errors that can occur while managing stored credentials.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No stored credential matches the lookup.
    #[error("no credentials found with the {key} \"{value}\"")]
    CredentialsNotFound {
        /// Which field was searched.
        key: LookupKey,
        /// The value searched for.
        value: String,
    },

    /// The credentials file exists but is not valid JSON.
    #[error("failed to parse contents of credentials file {}: {source}", .path.display())]
    MalformedCredentials {
        /// Location of the unreadable file.
        path: PathBuf,
        /// Underlying parse failure.
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request failed before a response was decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with `ok: false`.
    #[error("{method} failed: {code}")]
    Api {
        /// Error code reported by the platform.
        code: ApiErrorCode,
        /// API method that was called.
        method: String,
        /// Optional human description from the response.
        description: Option<String>,
    },

    /// The platform answered with something that is not a valid envelope.
    #[error("invalid response from {method}: {message}")]
    InvalidResponse {
        /// API method that was called.
        method: String,
        /// What was wrong with the response.
        message: String,
    },

    /// Another process held the credentials lock for too long.
    #[error("timed out after {waited_ms}ms waiting for lock on {}", .path.display())]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// Time spent waiting.
        waited_ms: u64,
    },

    /// Config directory could not be resolved.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl AuthError {
    /// A user-actionable hint for errors the user can fix themselves.
    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::CredentialsNotFound { .. } => {
                Some("Use the `login` command to authenticate with this workspace".to_string())
            }
            Self::MalformedCredentials { path, .. } => {
                Some(format!("Check that {} is valid JSON", path.display()))
            }
            Self::LockTimeout { path, .. } => Some(format!(
                "Another command may still be running; if not, remove {}",
                path.display()
            )),
            Self::Api { code, .. } => code.remediation().map(str::to_string),
            _ => None,
        }
    }

    /// The platform error code, for `Api` errors.
    pub fn api_code(&self) -> Option<&ApiErrorCode> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Field used to look up a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKey {
    /// Stable account identifier.
    AccountId,
    /// Legacy, non-unique account domain.
    AccountDomain,
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountId => f.write_str("account ID"),
            Self::AccountDomain => f.write_str("account domain"),
        }
    }
}

/// Error codes the platform reports for auth-related calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// The session was already logged out.
    AlreadyLoggedOut,
    /// The token is not valid.
    InvalidAuth,
    /// The token has expired.
    TokenExpired,
    /// The token was revoked.
    TokenRevoked,
    /// No token was sent.
    NotAuthed,
    /// Any other code, kept verbatim.
    Other(String),
}

impl ApiErrorCode {
    /// Wire form of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::AlreadyLoggedOut => "already_logged_out",
            Self::InvalidAuth => "invalid_auth",
            Self::TokenExpired => "token_expired",
            Self::TokenRevoked => "token_revoked",
            Self::NotAuthed => "not_authed",
            Self::Other(code) => code,
        }
    }

    /// User-facing description of the code.
    pub fn message(&self) -> &str {
        match self {
            Self::AlreadyLoggedOut => "You're already logged out",
            Self::InvalidAuth => "Your user account authorization isn't valid",
            Self::TokenExpired => "Your access token has expired",
            Self::TokenRevoked => "Your token has already been revoked",
            Self::NotAuthed => "No authentication token was provided",
            Self::Other(code) => code,
        }
    }

    fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::InvalidAuth | Self::TokenExpired | Self::TokenRevoked | Self::NotAuthed => {
                Some("Use the `login` command to authenticate again")
            }
            Self::AlreadyLoggedOut | Self::Other(_) => None,
        }
    }
}

impl From<&str> for ApiErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "already_logged_out" => Self::AlreadyLoggedOut,
            "invalid_auth" => Self::InvalidAuth,
            "token_expired" => Self::TokenExpired,
            "token_revoked" => Self::TokenRevoked,
            "not_authed" => Self::NotAuthed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
