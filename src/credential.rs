//! Credentials and the cached session derived from them.
//!
//! TRADE-OFFS
//! ==========
//! Token checks are purely structural (three dot-separated segments). No
//! signature or expiry is verified on the client; the shape check is a
//! UI-gating heuristic and the backend remains the authority.

use cookie::Cookie;
use serde::{Deserialize, Deserializer, Serialize};
use time::{Duration, OffsetDateTime};

use crate::role::Role;

/// True when `token` has exactly three non-empty dot-separated segments.
#[must_use]
pub fn is_well_formed_token(token: &str) -> bool {
    let mut segments = 0_usize;
    for segment in token.trim().split('.') {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == 3
}

// =============================================================================
// USER DATA
// =============================================================================

/// User payload returned by login and token verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    /// Backend ids are numeric; stored as text like every other storage value.
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}

/// Cached identity. Only meaningful while a credential is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub role: Option<Role>,
    pub user_id: String,
    pub username: String,
}

impl From<&UserData> for Session {
    fn from(user: &UserData) -> Self {
        Self {
            role: user.role.as_deref().and_then(Role::parse),
            user_id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

// =============================================================================
// COOKIES
// =============================================================================

/// One parsed `Set-Cookie` header. Only name, value and expiry matter here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    /// Non-positive `Max-Age`, an `Expires` in the past, or an empty value:
    /// the server is deleting the cookie.
    pub delete: bool,
}

/// Parse a `Set-Cookie` header value. Returns `None` when it is not a cookie.
///
/// `Max-Age` wins over `Expires` when both are present.
#[must_use]
pub fn parse_set_cookie(header: &str) -> Option<SetCookie> {
    let Ok(cookie) = Cookie::parse(header) else {
        return None;
    };
    let expired = match (cookie.max_age(), cookie.expires_datetime()) {
        (Some(max_age), _) => max_age <= Duration::ZERO,
        (None, Some(expires)) => expires <= OffsetDateTime::now_utc(),
        (None, None) => false,
    };
    let value = cookie.value_trimmed();
    Some(SetCookie { name: cookie.name().to_owned(), value: value.to_owned(), delete: expired || value.is_empty() })
}

/// Render jar entries as a `Cookie` request header value.
#[must_use]
pub fn cookie_header(entries: &[(String, String)]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    Some(
        entries
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[cfg(test)]
#[path = "credential_test.rs"]
mod tests;
