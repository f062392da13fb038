//! Filtering of known, benign auth errors.
//!
//! Some failures mean the remote session is already gone (logged out,
//! expired, revoked). Callers tearing down local state can treat those as
//! done and carry on. Everything else must reach the user.

use tracing::debug;

use crate::errors::{ApiErrorCode, AuthError};

/// Result of [`classify`].
#[derive(Debug)]
pub enum Classification {
    /// A known benign auth failure. The error has been absorbed.
    Recovered,
    /// Anything else, returned unchanged.
    Propagate(AuthError),
}

impl Classification {
    /// Whether the caller may proceed as if the call succeeded.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recovered)
    }

    /// `Ok(())` when recovered, the original error otherwise.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Self::Recovered => Ok(()),
            Self::Propagate(err) => Err(err),
        }
    }
}

/// Sort an error into recoverable or must-propagate.
pub fn classify(err: AuthError) -> Classification {
    let recoverable = match err.api_code() {
        Some(
            code @ (ApiErrorCode::AlreadyLoggedOut
            | ApiErrorCode::InvalidAuth
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::TokenRevoked),
        ) => {
            debug!("{}.", code.message());
            true
        }
        Some(ApiErrorCode::NotAuthed | ApiErrorCode::Other(_)) | None => false,
    };

    if recoverable {
        Classification::Recovered
    } else {
        Classification::Propagate(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use latch_core::capture_logs;
    use tracing::Level;

    use super::*;

    fn api(code: &str) -> AuthError {
        AuthError::Api {
            code: ApiErrorCode::from(code),
            method: "auth.revoke".to_string(),
            description: None,
        }
    }

    #[test]
    fn known_auth_codes_are_recovered() {
        for code in ["already_logged_out", "invalid_auth", "token_expired", "token_revoked"] {
            let outcome = classify(api(code));
            assert!(outcome.is_recoverable(), "{code} should be recoverable");
            assert!(outcome.into_result().is_ok());
        }
    }

    #[test]
    fn recovered_errors_leave_a_debug_trace() {
        let (logs, _guard) = capture_logs();
        let _ = classify(api("token_expired"));
        assert!(logs.has_event(Level::DEBUG, "Your access token has expired."));
    }

    #[test]
    fn unknown_api_codes_propagate() {
        let outcome = classify(api("ratelimited"));
        assert!(!outcome.is_recoverable());
        assert_matches!(
            outcome,
            Classification::Propagate(AuthError::Api { code: ApiErrorCode::Other(ref c), .. }) if c == "ratelimited"
        );
    }

    #[test]
    fn not_authed_propagates() {
        assert!(!classify(api("not_authed")).is_recoverable());
    }

    #[test]
    fn non_api_errors_propagate_unchanged() {
        let timeout = std::io::Error::new(std::io::ErrorKind::TimedOut, "network timeout");
        let err = classify(AuthError::Io(timeout)).into_result().unwrap_err();
        assert_matches!(&err, AuthError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut);
        assert!(err.to_string().contains("network timeout"));
    }
}
