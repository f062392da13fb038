//! API host resolution.
//!
//! Precedence, highest first:
//! 1. explicit override (normalized to `https`)
//! 2. development mode
//! 3. the active credential's stored `api_host`
//! 4. production

use std::fmt;

use tracing::{debug, warn};

use crate::types::Credential;

/// Production API endpoint.
pub const DEFAULT_PROD_HOST: &str = "https://slack.com";
/// Development API endpoint.
pub const DEFAULT_DEV_HOST: &str = "https://dev.slack.com";
/// Domain used for credentials that carry no `api_host`.
pub const DEFAULT_DOMAIN: &str = "slack.com";

/// Outcome of [`resolve_api_host`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedHost {
    /// Effective endpoint.
    pub host: String,
    /// Development mode after resolution. An explicit override decides this
    /// from its own shape.
    pub dev_mode: bool,
}

impl ResolvedHost {
    /// Effective endpoint.
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for ResolvedHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// Pick the endpoint requests should target.
///
/// Emits a debug hint when the result is not production and a warning when
/// `dev_mode` was requested but the result is not a development host. Neither
/// changes the returned value.
///
/// The warning checks the caller's `dev_mode`, not the re-derived one. After
/// re-derivation a `true` flag always comes with a dev host, so only the
/// requested flag can catch an override that leaves dev mode behind.
pub fn resolve_api_host(
    explicit: Option<&str>,
    dev_mode: bool,
    credential: Option<&Credential>,
) -> ResolvedHost {
    let explicit = explicit.filter(|h| !h.is_empty());

    let requested_dev = dev_mode;
    let (host, dev_mode) = if let Some(flag) = explicit {
        let host = to_https(flag);
        let dev = is_dev_host(&host);
        (host, dev)
    } else if dev_mode {
        (DEFAULT_DEV_HOST.to_string(), true)
    } else if let Some(stored) = credential
        .and_then(|c| c.api_host.as_deref())
        .filter(|h| !h.is_empty())
    {
        (to_https(stored), false)
    } else {
        (DEFAULT_PROD_HOST.to_string(), false)
    };

    if !is_prod_host(&host) {
        debug!(
            %host,
            "using a custom API host; run `var add SLACK_API_URL {host}` to expose it to your app"
        );
    }
    if requested_dev && !is_dev_host(&host) {
        warn!(
            %host,
            "the dev flag is set but the API host is a production workspace or a custom endpoint"
        );
    }

    ResolvedHost { host, dev_mode }
}

/// Replace the URL scheme with `https`.
///
/// Input without a scheme is prefixed with `https://`.
pub fn to_https(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    match url.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => format!("https://{rest}"),
        _ => format!("https://{url}"),
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Whether `host` is a development endpoint (`dev.slack.com`,
/// `https://dev1234.slack.com`, ...). Requires a full URL.
pub fn is_dev_host(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    reqwest::Url::parse(host)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .and_then(|h| h.split('.').next().map(|label| label.starts_with("dev")))
        .unwrap_or(false)
}

/// Whether `host` is exactly the production endpoint.
pub fn is_prod_host(host: &str) -> bool {
    host == DEFAULT_PROD_HOST
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
