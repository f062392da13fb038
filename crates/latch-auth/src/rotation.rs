//! Best-effort token rotation across every stored credential.
//!
//! A credential whose rotation fails keeps its old token and the batch moves
//! on. One broken account must not block commands for the others, and the
//! failing account's next real request reports the auth error where the user
//! can act on it.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::api::AuthApi;
use crate::host::DEFAULT_PROD_HOST;
use crate::types::{Credential, Credentials};

/// Host a credential's rotation call should target.
pub fn rotation_host(credential: &Credential) -> &str {
    credential
        .api_host
        .as_deref()
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_PROD_HOST)
}

/// Rotate every credential that is due at `now`.
///
/// Returns the updated collection and whether any token changed. Keys and
/// account IDs are never altered. Failures are logged and never returned.
pub async fn rotate_all(
    credentials: Credentials,
    api: &dyn AuthApi,
    buffer_secs: u64,
    now: DateTime<Utc>,
) -> (Credentials, bool) {
    let mut rotated = Credentials::new();
    let mut changed = false;

    for (key, credential) in credentials {
        let credential = match rotate_one(credential, api, buffer_secs, now).await {
            (credential, true) => {
                changed = true;
                credential
            }
            (credential, false) => credential,
        };
        let _ = rotated.insert(key, credential);
    }

    (rotated, changed)
}

async fn rotate_one(
    mut credential: Credential,
    api: &dyn AuthApi,
    buffer_secs: u64,
    now: DateTime<Utc>,
) -> (Credential, bool) {
    if !credential.should_rotate(now, buffer_secs) {
        return (credential, false);
    }

    let host = rotation_host(&credential).to_string();
    debug!(account_id = %credential.account_id, %host, "rotating token");

    match api.rotate_token(&host, &credential).await {
        Ok(fresh) => {
            credential.token = fresh.token;
            credential.refresh_token = fresh.refresh_token;
            credential.expires_at = fresh.expires_at;
            credential.last_updated = now;
            (credential, true)
        }
        Err(e) => {
            debug!(
                account_id = %credential.account_id,
                domain = %credential.account_domain,
                "auth token is outdated; refreshing the credentials failed: {e}"
            );
            (credential, false)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
