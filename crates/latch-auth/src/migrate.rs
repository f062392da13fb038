//! Legacy key migration.
//!
//! Older files keyed credentials by account domain, which is not unique: an
//! organization and a workspace can share a name. Every read re-keys such
//! entries under their account ID. Entries whose key already has the shape of
//! an account ID are left alone.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::types::Credentials;

static ACCOUNT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[TE][A-Z0-9]{8,}$").expect("account ID pattern is valid"));

/// Whether `key` has the shape of a workspace (`T…`) or organization (`E…`) ID.
pub fn looks_like_account_id(key: &str) -> bool {
    ACCOUNT_ID_PATTERN.is_match(key)
}

/// Re-key legacy entries under their account ID.
///
/// Returns the migrated collection and whether any key moved, in which case
/// the caller should persist the result. Running it again on its own output
/// moves nothing.
///
/// Entries already keyed by an account ID are visited after legacy ones, so
/// when two entries land on the same account ID the ID-keyed record survives.
/// Between two legacy entries the later one in key order wins. Either way a
/// warning is logged.
pub fn migrate_to_account_ids(credentials: Credentials) -> (Credentials, bool) {
    let mut migrated = Credentials::new();
    let mut changed = false;

    let (current, legacy): (Vec<_>, Vec<_>) = credentials
        .into_iter()
        .partition(|(key, _)| looks_like_account_id(key));

    for (key, credential) in legacy.into_iter().chain(current) {
        let target = if looks_like_account_id(&key) || credential.account_id.is_empty() {
            if credential.account_id.is_empty() {
                warn!(key = %key, "stored credential has no account ID, keeping legacy key");
            }
            key
        } else {
            if key != credential.account_id {
                debug!(from = %key, to = %credential.account_id, "re-keying credential by account ID");
                changed = true;
            }
            credential.account_id.clone()
        };

        let domain = credential.account_domain.clone();
        if let Some(previous) = migrated.insert(target.clone(), credential) {
            warn!(
                account_id = %target,
                kept = %domain,
                dropped = %previous.account_domain,
                "two stored credentials share an account ID, dropping one"
            );
            changed = true;
        }
    }

    (migrated, changed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
