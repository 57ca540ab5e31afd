//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ClientError;
use crate::session::LocalCredentialPolicy;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOGIN_ROUTE: &str = "/login/";
pub const DEFAULT_PROTECTED_PREFIXES: &str = "/admin/,/manager/,/chef/,/waiter/,/cashier/";
pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAYMENT_RETRIES: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend origin without trailing slash.
    pub base_url: String,
    pub login_route: String,
    /// Paths starting with any of these require a session.
    pub protected_prefixes: Vec<String>,
    /// Period of the per-page refresh timer.
    pub refresh_interval: Duration,
    pub timeouts: Timeouts,
    /// Extra attempts for a payment after a retryable failure.
    pub payment_retries: u32,
    pub local_policy: LocalCredentialPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            login_route: DEFAULT_LOGIN_ROUTE.to_owned(),
            protected_prefixes: parse_prefixes(DEFAULT_PROTECTED_PREFIXES),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            payment_retries: DEFAULT_PAYMENT_RETRIES,
            local_policy: LocalCredentialPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `POS_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `POS_LOGIN_ROUTE`: default `/login/`
    /// - `POS_PROTECTED_PREFIXES`: comma-separated path prefixes
    /// - `POS_REFRESH_SECS`: default 30
    /// - `POS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `POS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `POS_PAYMENT_RETRIES`: default 1
    /// - `POS_VERIFY_LOCAL_TOKEN`: when true, a local token no longer skips server verification
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an unusable base URL, route or boolean.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] for an unusable base URL, route or boolean.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = parse_base_url(lookup("POS_BASE_URL").as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let login_route = parse_route(lookup("POS_LOGIN_ROUTE").as_deref().unwrap_or(DEFAULT_LOGIN_ROUTE))?;
        let protected_prefixes =
            parse_prefixes(lookup("POS_PROTECTED_PREFIXES").as_deref().unwrap_or(DEFAULT_PROTECTED_PREFIXES));
        let refresh_secs = parse_or(&lookup, "POS_REFRESH_SECS", DEFAULT_REFRESH_SECS).max(1);
        let timeouts = Timeouts {
            request_secs: parse_or(&lookup, "POS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "POS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let payment_retries = parse_or(&lookup, "POS_PAYMENT_RETRIES", DEFAULT_PAYMENT_RETRIES);
        let local_policy = match lookup("POS_VERIFY_LOCAL_TOKEN") {
            None => LocalCredentialPolicy::default(),
            Some(raw) => match parse_bool(&raw) {
                Some(true) => LocalCredentialPolicy::AlwaysVerify,
                Some(false) => LocalCredentialPolicy::TrustLocal,
                None => return Err(ClientError::Config(format!("invalid POS_VERIFY_LOCAL_TOKEN: {raw}"))),
            },
        };

        Ok(Self {
            base_url,
            login_route,
            protected_prefixes,
            refresh_interval: Duration::from_secs(refresh_secs),
            timeouts,
            payment_retries,
            local_policy,
        })
    }

    /// Whether `path` sits under one of the protected prefixes.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return Ok(trimmed.to_owned());
    }
    Err(ClientError::Config(format!("invalid POS_BASE_URL: {raw}")))
}

fn parse_route(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') {
        return Ok(trimmed.to_owned());
    }
    Err(ClientError::Config(format!("route must start with '/': {raw}")))
}

fn parse_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| p.starts_with('/'))
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
