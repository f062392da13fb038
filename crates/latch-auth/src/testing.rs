//! In-memory [`AuthApi`] double for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::AuthApi;
use crate::errors::{ApiErrorCode, AuthError};
use crate::types::{Credential, RotatedToken, SessionInfo};

type Scripted<T> = Result<T, ApiErrorCode>;

fn api_error(code: ApiErrorCode, method: &str) -> AuthError {
    AuthError::Api {
        code,
        method: method.to_string(),
        description: None,
    }
}

/// Answers are scripted per refresh token (rotation) or per bearer token
/// (validate, revoke). Unscripted calls fail with `invalid_auth`.
#[derive(Default)]
pub(crate) struct FakeAuthApi {
    rotations: HashMap<String, Scripted<RotatedToken>>,
    sessions: HashMap<String, Scripted<SessionInfo>>,
    revocations: HashMap<String, Scripted<()>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeAuthApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_rotation(mut self, refresh: &str, answer: Scripted<RotatedToken>) -> Self {
        let _ = self.rotations.insert(refresh.to_string(), answer);
        self
    }

    pub(crate) fn with_session(mut self, token: &str, answer: Scripted<SessionInfo>) -> Self {
        let _ = self.sessions.insert(token.to_string(), answer);
        self
    }

    pub(crate) fn with_revocation(mut self, token: &str, answer: Scripted<()>) -> Self {
        let _ = self.revocations.insert(token.to_string(), answer);
        self
    }

    /// `(host, account_id)` for each rotation attempt, in call order.
    pub(crate) fn rotation_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn rotate_token(
        &self,
        host: &str,
        credential: &Credential,
    ) -> Result<RotatedToken, AuthError> {
        self.calls
            .lock()
            .unwrap()
            .push((host.to_string(), credential.account_id.clone()));
        let refresh = credential.refresh_token.as_deref().unwrap_or_default();
        match self.rotations.get(refresh) {
            Some(Ok(token)) => Ok(token.clone()),
            Some(Err(code)) => Err(api_error(code.clone(), "tooling.tokens.rotate")),
            None => Err(api_error(ApiErrorCode::InvalidAuth, "tooling.tokens.rotate")),
        }
    }

    async fn validate_session(&self, _host: &str, token: &str) -> Result<SessionInfo, AuthError> {
        match self.sessions.get(token) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(code)) => Err(api_error(code.clone(), "auth.test")),
            None => Err(api_error(ApiErrorCode::InvalidAuth, "auth.test")),
        }
    }

    async fn revoke_token(&self, _host: &str, token: &str) -> Result<(), AuthError> {
        match self.revocations.get(token) {
            Some(Ok(())) => Ok(()),
            Some(Err(code)) => Err(api_error(code.clone(), "auth.revoke")),
            None => Err(api_error(ApiErrorCode::InvalidAuth, "auth.revoke")),
        }
    }
}
