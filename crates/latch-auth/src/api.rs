//! Network collaborator for credential validation, rotation and revocation.
//!
//! Every call names its target host explicitly, so rotating credentials for
//! several accounts on different environments never touches shared state.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{ApiErrorCode, AuthError};
use crate::host::is_dev_host;
use crate::types::{Credential, RotatedToken, SessionInfo};

const ROTATE_METHOD: &str = "tooling.tokens.rotate";
const VALIDATE_METHOD: &str = "auth.test";
const REVOKE_METHOD: &str = "auth.revoke";

/// Ephemeral dev hosts can be slow to wake; don't let rotation wait on them.
const DEV_HOST_ROTATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Remote operations the credential manager depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange the credential's refresh token for new token material.
    async fn rotate_token(
        &self,
        host: &str,
        credential: &Credential,
    ) -> Result<RotatedToken, AuthError>;

    /// Describe the identity behind a bearer token.
    async fn validate_session(&self, host: &str, token: &str) -> Result<SessionInfo, AuthError>;

    /// Invalidate a bearer token.
    async fn revoke_token(&self, host: &str, token: &str) -> Result<(), AuthError>;
}

/// [`AuthApi`] over HTTP form posts to `{host}/api/{method}`.
#[derive(Clone, Debug, Default)]
pub struct HttpAuthApi {
    client: reqwest::Client,
}

impl HttpAuthApi {
    /// Create with a default `reqwest` client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create around an existing client (shared pool, custom timeouts).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        host: &str,
        method: &str,
        bearer: Option<&str>,
        form: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<T, AuthError> {
        let url = format!("{}/api/{method}", host.trim_end_matches('/'));
        let mut request = self.client.post(&url).form(form);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let invalid = |message: String| AuthError::InvalidResponse {
            method: method.to_string(),
            message,
        };

        if body.trim().is_empty() {
            return Err(invalid(format!("empty body (status {status})")));
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| invalid(format!("status {status}: {e}")))?;

        if value.get("ok").and_then(Value::as_bool) != Some(true) {
            let code = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(AuthError::Api {
                code: ApiErrorCode::from(code),
                method: method.to_string(),
                description: value
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
    }
}

#[derive(Deserialize)]
struct RotateResponse {
    token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    exp: i64,
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[tracing::instrument(skip_all, fields(account_id = %credential.account_id))]
    async fn rotate_token(
        &self,
        host: &str,
        credential: &Credential,
    ) -> Result<RotatedToken, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidResponse {
                method: ROTATE_METHOD.to_string(),
                message: "refresh token is empty".to_string(),
            })?;

        let timeout = is_dev_host(host).then_some(DEV_HOST_ROTATE_TIMEOUT);
        let resp: RotateResponse = self
            .post_form(
                host,
                ROTATE_METHOD,
                None,
                &[("refresh_token", refresh_token)],
                timeout,
            )
            .await?;

        Ok(RotatedToken {
            token: resp.token,
            refresh_token: Some(resp.refresh_token).filter(|t| !t.is_empty()),
            expires_at: Some(resp.exp).filter(|e| *e != 0),
        })
    }

    #[tracing::instrument(skip_all)]
    async fn validate_session(&self, host: &str, token: &str) -> Result<SessionInfo, AuthError> {
        self.post_form(host, VALIDATE_METHOD, Some(token), &[], None)
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn revoke_token(&self, host: &str, token: &str) -> Result<(), AuthError> {
        let _: Value = self
            .post_form(host, REVOKE_METHOD, Some(token), &[("token", token)], None)
            .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
