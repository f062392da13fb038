//! Auth facade.
//!
//! [`AuthClient`] is what the rest of the tool talks to. Reads load the
//! document, migrate legacy keys, rotate expiring tokens and persist only if
//! something changed. Writes load and migrate, apply the change and always
//! persist. Each cycle holds the store's advisory lock from load to save.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use latch_settings::{AuthSettings, LatchSettings};
use tracing::debug;

use crate::api::{AuthApi, HttpAuthApi};
use crate::classify::classify;
use crate::errors::{AuthError, LookupKey};
use crate::host::{DEFAULT_DOMAIN, ResolvedHost, resolve_api_host};
use crate::migrate::migrate_to_account_ids;
use crate::rotation::rotate_all;
use crate::store::CredentialStore;
use crate::types::{Credential, Credentials};

/// Credential manager for every account the user is logged in to.
#[derive(Clone)]
pub struct AuthClient {
    store: CredentialStore,
    api: Arc<dyn AuthApi>,
    refresh_buffer_secs: u64,
    lock_timeout: Duration,
    api_host: Option<String>,
    dev_mode: bool,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("store", &self.store)
            .field("refresh_buffer_secs", &self.refresh_buffer_secs)
            .field("lock_timeout", &self.lock_timeout)
            .field("api_host", &self.api_host)
            .field("dev_mode", &self.dev_mode)
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    /// Client over `store`, talking to the platform through `api`.
    pub fn new(store: CredentialStore, api: Arc<dyn AuthApi>) -> Self {
        let defaults = AuthSettings::default();
        Self {
            store,
            api,
            refresh_buffer_secs: defaults.refresh_buffer_seconds,
            lock_timeout: Duration::from_millis(defaults.lock_timeout_ms),
            api_host: None,
            dev_mode: false,
        }
    }

    /// Client over the configured directory using HTTP for remote calls.
    pub fn from_settings(settings: &LatchSettings) -> Result<Self, AuthError> {
        let store = CredentialStore::from_settings(settings)?;
        Ok(Self::new(store, Arc::new(HttpAuthApi::new()))
            .with_auth_settings(&settings.auth)
            .with_host_settings(settings.api_host.clone(), settings.dev_mode))
    }

    /// Apply rotation buffer and lock timeout from `auth`.
    #[must_use]
    pub fn with_auth_settings(mut self, auth: &AuthSettings) -> Self {
        self.refresh_buffer_secs = auth.refresh_buffer_seconds;
        self.lock_timeout = Duration::from_millis(auth.lock_timeout_ms);
        self
    }

    /// Apply the explicit host override and development-mode flag used by
    /// [`AuthClient::resolve_api_host`].
    #[must_use]
    pub fn with_host_settings(mut self, api_host: Option<String>, dev_mode: bool) -> Self {
        self.api_host = api_host;
        self.dev_mode = dev_mode;
        self
    }

    /// Endpoint for requests made with `credential`, honoring the configured
    /// override and development mode.
    pub fn resolve_api_host(&self, credential: Option<&Credential>) -> ResolvedHost {
        resolve_api_host(self.api_host.as_deref(), self.dev_mode, credential)
    }

    /// The underlying credentials document.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Credential stored for `account_id`.
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn auth_with_account_id(&self, account_id: &str) -> Result<Credential, AuthError> {
        let mut credentials = self.read_all().await?;
        let key = credentials
            .key_for_account(account_id)
            .map(str::to_string)
            .ok_or_else(|| not_found(account_id))?;
        credentials.remove(&key).ok_or_else(|| not_found(account_id))
    }

    /// First credential whose domain is `domain`.
    ///
    /// Domains are not unique: an organization and a workspace can share one.
    /// Prefer [`AuthClient::auth_with_account_id`].
    #[tracing::instrument(skip_all, fields(domain = %domain))]
    pub async fn auth_with_domain(&self, domain: &str) -> Result<Credential, AuthError> {
        let credentials = self.read_all().await?;
        let mut matches = credentials
            .into_iter()
            .map(|(_, c)| c)
            .filter(|c| c.account_domain == domain);

        let first = matches.next().ok_or_else(|| AuthError::CredentialsNotFound {
            key: LookupKey::AccountDomain,
            value: domain.to_string(),
        })?;
        let others = matches.count();
        if others > 0 {
            debug!(
                domain,
                chosen = %first.account_id,
                others,
                "several stored credentials share this domain"
            );
        }
        Ok(first)
    }

    /// Every stored credential, ordered by account ID.
    #[tracing::instrument(skip_all)]
    pub async fn auths(&self) -> Result<Vec<Credential>, AuthError> {
        let credentials = self.read_all().await?;
        Ok(credentials.into_iter().map(|(_, c)| c).collect())
    }

    /// Insert or replace the credential for its account ID.
    ///
    /// Stamps `last_updated` and returns the stored record with the path of
    /// the written document.
    #[tracing::instrument(skip_all, fields(account_id = %credential.account_id))]
    pub async fn set_auth(
        &self,
        mut credential: Credential,
    ) -> Result<(Credential, PathBuf), AuthError> {
        credential.last_updated = Utc::now();

        let _lock = self.store.lock(self.lock_timeout).await?;
        let mut credentials = self.load_migrated()?;
        let stale: Vec<String> = credentials
            .iter()
            .filter(|(k, c)| c.account_id == credential.account_id && **k != credential.account_id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            debug!(%key, "replacing credential stored under another key");
            let _ = credentials.remove(&key);
        }
        let _ = credentials.insert(credential.account_id.clone(), credential.clone());
        let path = self.store.save(&credentials)?;
        Ok((credential, path))
    }

    /// Remove the credential for `account_id` and return it.
    #[tracing::instrument(skip_all, fields(account_id = %account_id))]
    pub async fn delete_auth(&self, account_id: &str) -> Result<Credential, AuthError> {
        let _lock = self.store.lock(self.lock_timeout).await?;
        let mut credentials = self.load_migrated()?;
        let key = credentials
            .key_for_account(account_id)
            .map(str::to_string)
            .ok_or_else(|| not_found(account_id))?;
        let removed = credentials
            .remove(&key)
            .ok_or_else(|| not_found(account_id))?;
        let _ = self.store.save(&credentials)?;
        Ok(removed)
    }

    /// Build a credential for a freshly obtained `token`.
    ///
    /// The token is validated against `host`. Nothing is persisted; pass the
    /// result to [`AuthClient::set_auth`] to keep it.
    #[tracing::instrument(skip_all, fields(host = %host))]
    pub async fn auth_with_token(&self, host: &str, token: &str) -> Result<Credential, AuthError> {
        let session = self.api.validate_session(host, token).await?;

        let account_domain = session
            .url
            .as_deref()
            .and_then(|u| reqwest::Url::parse(u).ok())
            .and_then(|u| {
                u.host_str()
                    .and_then(|h| h.split('.').next())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        Ok(Credential {
            token: token.to_string(),
            account_domain,
            account_id: session.team_id.unwrap_or_default(),
            user_id: session.user_id,
            enterprise_id: session.enterprise_id,
            is_enterprise_install: session.is_enterprise_install.unwrap_or(false),
            last_updated: Utc::now(),
            ..Credential::default()
        })
    }

    /// Revoke `token` on `host`.
    ///
    /// A token that is already logged out, invalid, expired or revoked counts
    /// as revoked.
    #[tracing::instrument(skip_all, fields(host = %host))]
    pub async fn revoke_token(&self, host: &str, token: &str) -> Result<(), AuthError> {
        match self.api.revoke_token(host, token).await {
            Ok(()) => Ok(()),
            Err(e) => classify(e).into_result(),
        }
    }

    /// `token@domain` pairs for every API host with a stored credential,
    /// joined by `;` with the longest domain first.
    ///
    /// When several credentials share a host the last one by account ID is
    /// used. Credentials with an unparseable host are skipped.
    #[tracing::instrument(skip_all)]
    pub async fn map_tokens_to_domains(&self) -> Result<String, AuthError> {
        let credentials = self.read_all().await?;

        let mut by_domain: BTreeMap<String, String> = BTreeMap::new();
        for credential in credentials.values() {
            let domain = match credential.api_host.as_deref() {
                Some(api_host) => match reqwest::Url::parse(api_host) {
                    Ok(url) => match (url.host_str(), url.port()) {
                        (Some(h), Some(port)) => format!("{h}:{port}"),
                        (Some(h), None) => h.to_string(),
                        (None, _) => continue,
                    },
                    Err(e) => {
                        debug!(%api_host, "skipping credential with unparseable host: {e}");
                        continue;
                    }
                },
                None => DEFAULT_DOMAIN.to_string(),
            };
            let _ = by_domain.insert(domain, credential.token.clone());
        }

        let mut pairs: Vec<(String, String)> = by_domain.into_iter().collect();
        pairs.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Ok(pairs
            .into_iter()
            .map(|(domain, token)| format!("{token}@{domain}"))
            .collect::<Vec<_>>()
            .join(";"))
    }

    async fn read_all(&self) -> Result<Credentials, AuthError> {
        let _lock = self.store.lock(self.lock_timeout).await?;

        debug!(path = ?self.store.path(), "reading credentials file");
        let Some(stored) = self.store.load()? else {
            return Ok(Credentials::new());
        };

        let (migrated, renamed) = migrate_to_account_ids(stored);
        let (rotated, refreshed) = rotate_all(
            migrated,
            self.api.as_ref(),
            self.refresh_buffer_secs,
            Utc::now(),
        )
        .await;

        if renamed || refreshed {
            let _ = self.store.save(&rotated)?;
        }
        Ok(rotated)
    }

    fn load_migrated(&self) -> Result<Credentials, AuthError> {
        let stored = self.store.load()?.unwrap_or_default();
        Ok(migrate_to_account_ids(stored).0)
    }
}

fn not_found(account_id: &str) -> AuthError {
    AuthError::CredentialsNotFound {
        key: LookupKey::AccountId,
        value: account_id.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
