//! # latch-auth
//!
//! Credential management for a CLI that is logged in to several workspaces
//! and organizations at once.
//!
//! Credentials live in `credentials.json` inside the config directory, keyed
//! by account ID. Every read:
//! 1. loads the document ([`store`])
//! 2. re-keys legacy domain-keyed entries ([`migrate`])
//! 3. rotates tokens that are about to expire ([`rotation`])
//! 4. saves again if either step changed anything
//!
//! [`AuthClient`] wraps that cycle behind lookup and mutation operations.
//! [`resolve_api_host`] and [`classify`] are usable on their own.
//!
//! # Example
//!
//! ```no_run
//! use latch_auth::AuthClient;
//! use latch_settings::load_settings;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = load_settings()?;
//! let client = AuthClient::from_settings(&settings)?;
//! for credential in client.auths().await? {
//!     println!("{} ({})", credential.account_domain, credential.account_id);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod api;
pub mod classify;
pub mod client;
pub mod errors;
pub mod host;
pub mod migrate;
pub mod rotation;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AuthApi, HttpAuthApi};
pub use classify::{Classification, classify};
pub use client::AuthClient;
pub use errors::{ApiErrorCode, AuthError, LookupKey};
pub use host::{
    DEFAULT_DEV_HOST, DEFAULT_DOMAIN, DEFAULT_PROD_HOST, ResolvedHost, is_dev_host, is_prod_host,
    resolve_api_host, to_https,
};
pub use migrate::{looks_like_account_id, migrate_to_account_ids};
pub use rotation::rotate_all;
pub use store::{CredentialStore, StoreLock};
pub use types::{AuthLevel, Credential, Credentials, RotatedToken, SessionInfo};
