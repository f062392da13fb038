//! Credential data model.
//!
//! Mirrors the on-disk schema of `credentials.json`: a JSON object keyed by
//! account ID whose values are [`Credential`] records. Field names on disk
//! (`team_id`, `team_domain`, `exp`, ...) are kept stable so existing files
//! keep loading.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One authenticated identity for one remote account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Human-readable workspace or organization name. Not unique.
    #[serde(rename = "team_domain", default)]
    pub account_domain: String,
    /// Stable account identifier, the canonical storage key.
    #[serde(rename = "team_id", default)]
    pub account_id: String,
    /// Enterprise the account belongs to, if any.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub enterprise_id: Option<String>,
    /// Authorizing user.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub user_id: Option<String>,
    /// Set on every mutation.
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    /// Endpoint override for this account.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub api_host: Option<String>,
    /// Rotation material. Absent for non-rotatable tokens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub refresh_token: Option<String>,
    /// Expiry in unix seconds. Absent means the token never expires.
    #[serde(
        rename = "exp",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "zero_as_none"
    )]
    pub expires_at: Option<i64>,
    /// Whether this is an organization-wide install.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_enterprise_install: bool,
}

impl Credential {
    /// Organization or workspace level.
    pub fn auth_level(&self) -> AuthLevel {
        if self.is_enterprise_install {
            AuthLevel::Organization
        } else {
            AuthLevel::Workspace
        }
    }

    /// Whether the token can and should be rotated at `now`.
    ///
    /// Requires a refresh token and an expiry, and the expiry must fall
    /// within `buffer_secs` of `now` (or already be past).
    pub fn should_rotate(&self, now: DateTime<Utc>, buffer_secs: u64) -> bool {
        if self.refresh_token.as_deref().is_none_or(str::is_empty) {
            return false;
        }
        let Some(expires_at) = self.expires_at else {
            return false;
        };
        let buffer = i64::try_from(buffer_secs).unwrap_or(i64::MAX);
        expires_at.saturating_sub(now.timestamp()) <= buffer
    }

    /// Whether the token is past its expiry. Non-expiring tokens never are.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now.timestamp() > exp)
    }
}

/// Install level of a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLevel {
    /// Enterprise-wide install.
    Organization,
    /// Single workspace install.
    Workspace,
}

impl fmt::Display for AuthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Organization => f.write_str("organization"),
            Self::Workspace => f.write_str("workspace"),
        }
    }
}

/// The persisted credential collection.
///
/// Keyed by account ID once migrated. Legacy files may still be keyed by
/// account domain until the first read migrates them. Ordered so the file
/// diffs cleanly between writes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, Credential>);

impl Credentials {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by storage key.
    pub fn get(&self, key: &str) -> Option<&Credential> {
        self.0.get(key)
    }

    /// Insert under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, credential: Credential) -> Option<Credential> {
        self.0.insert(key.into(), credential)
    }

    /// Remove the entry under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Credential> {
        self.0.remove(key)
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Storage key of the record whose account ID is `account_id`.
    ///
    /// Keys are not trusted to match their record: an ID-shaped key is kept
    /// through migration even when its record names another account. An
    /// exact key match wins, otherwise the first record in key order.
    pub fn key_for_account(&self, account_id: &str) -> Option<&str> {
        if self
            .0
            .get(account_id)
            .is_some_and(|c| c.account_id == account_id)
        {
            return self.0.get_key_value(account_id).map(|(k, _)| k.as_str());
        }
        self.0
            .iter()
            .find(|(_, c)| c.account_id == account_id)
            .map(|(k, _)| k.as_str())
    }

    /// Iterate `(key, credential)` pairs in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Credential> {
        self.0.iter()
    }

    /// Iterate stored credentials in key order.
    pub fn values(&self) -> btree_map::Values<'_, String, Credential> {
        self.0.values()
    }

    /// Iterate storage keys in order.
    pub fn keys(&self) -> btree_map::Keys<'_, String, Credential> {
        self.0.keys()
    }
}

impl IntoIterator for Credentials {
    type Item = (String, Credential);
    type IntoIter = btree_map::IntoIter<String, Credential>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Credentials {
    type Item = (&'a String, &'a Credential);
    type IntoIter = btree_map::Iter<'a, String, Credential>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, Credential)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, Credential)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// New token material returned by a successful rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RotatedToken {
    /// Replacement bearer token.
    pub token: String,
    /// Replacement refresh token.
    pub refresh_token: Option<String>,
    /// New expiry in unix seconds.
    pub expires_at: Option<i64>,
}

/// Identity details reported for a bearer token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    /// Workspace URL, e.g. `https://acme.slack.com/`.
    pub url: Option<String>,
    /// Account identifier.
    pub team_id: Option<String>,
    /// User identifier.
    pub user_id: Option<String>,
    /// Enterprise identifier.
    pub enterprise_id: Option<String>,
    /// Organization-wide install flag.
    pub is_enterprise_install: Option<bool>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.filter(|n| *n != 0))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn rotatable(expires_at: i64) -> Credential {
        Credential {
            account_id: "T123456789A".to_string(),
            token: "xoxe.xoxp-1".to_string(),
            refresh_token: Some("xoxe-1".to_string()),
            expires_at: Some(expires_at),
            ..Default::default()
        }
    }

    #[test]
    fn should_rotate_within_buffer() {
        let now = at(1_000_000);
        assert!(rotatable(1_000_000 + 300).should_rotate(now, 300));
        assert!(rotatable(1_000_000 - 10).should_rotate(now, 300));
        assert!(!rotatable(1_000_000 + 301).should_rotate(now, 300));
    }

    #[test]
    fn should_not_rotate_without_material() {
        let now = at(1_000_000);

        let mut no_refresh = rotatable(0);
        no_refresh.refresh_token = None;
        assert!(!no_refresh.should_rotate(now, 300));

        let mut empty_refresh = rotatable(0);
        empty_refresh.refresh_token = Some(String::new());
        assert!(!empty_refresh.should_rotate(now, 300));

        let mut no_expiry = rotatable(0);
        no_expiry.expires_at = None;
        assert!(!no_expiry.should_rotate(now, 300));
    }

    #[test]
    fn is_expired_semantics() {
        let now = at(500);
        assert!(rotatable(499).is_expired(now));
        assert!(!rotatable(500).is_expired(now));
        assert!(!Credential::default().is_expired(now));
    }

    #[test]
    fn auth_level_from_install_flag() {
        let mut c = Credential::default();
        assert_eq!(c.auth_level(), AuthLevel::Workspace);
        c.is_enterprise_install = true;
        assert_eq!(c.auth_level(), AuthLevel::Organization);
        assert_eq!(c.auth_level().to_string(), "organization");
    }

    #[test]
    fn key_for_account_matches_record_not_key() {
        let record = |id: &str| Credential {
            account_id: id.to_string(),
            ..Default::default()
        };
        let creds: Credentials = [
            ("T111111111A", record("T222222222B")),
            ("T333333333C", record("T333333333C")),
        ]
        .into_iter()
        .collect();

        assert_eq!(creds.key_for_account("T222222222B"), Some("T111111111A"));
        assert_eq!(creds.key_for_account("T333333333C"), Some("T333333333C"));
        assert_eq!(creds.key_for_account("T111111111A"), None);
    }

    #[test]
    fn key_for_account_prefers_exact_key() {
        let record = |id: &str, token: &str| Credential {
            account_id: id.to_string(),
            token: token.to_string(),
            ..Default::default()
        };
        let creds: Credentials = [
            ("E000000000Z", record("T222222222B", "stale")),
            ("T222222222B", record("T222222222B", "current")),
        ]
        .into_iter()
        .collect();
        assert_eq!(creds.key_for_account("T222222222B"), Some("T222222222B"));
    }

    #[test]
    fn decodes_legacy_on_disk_fields() {
        let c: Credential = serde_json::from_value(json!({
            "token": "xoxp-1",
            "team_domain": "my-team",
            "team_id": "T002",
            "user_id": "U1",
            "enterprise_id": "",
            "refresh_token": "",
            "exp": 0,
            "last_updated": "0001-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(c.account_domain, "my-team");
        assert_eq!(c.account_id, "T002");
        assert_eq!(c.user_id.as_deref(), Some("U1"));
        assert!(c.enterprise_id.is_none());
        assert!(c.refresh_token.is_none());
        assert!(c.expires_at.is_none());
        assert!(!c.is_enterprise_install);
    }

    #[test]
    fn encodes_without_empty_optionals() {
        let c = Credential {
            token: "xoxp-1".to_string(),
            account_domain: "acme".to_string(),
            account_id: "T123456789A".to_string(),
            ..Default::default()
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["team_id"], "T123456789A");
        assert_eq!(v["team_domain"], "acme");
        assert!(v.get("exp").is_none());
        assert!(v.get("refresh_token").is_none());
        assert!(v.get("api_host").is_none());
        assert!(v.get("is_enterprise_install").is_none());
    }

    #[test]
    fn collection_is_a_plain_object() {
        let creds: Credentials = [("T123456789A", rotatable(10))].into_iter().collect();
        let v = serde_json::to_value(&creds).unwrap();
        assert_eq!(v["T123456789A"]["exp"], 10);

        let back: Credentials = serde_json::from_value(v).unwrap();
        assert_eq!(back, creds);
    }
}
