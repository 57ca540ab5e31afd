//! The browsing context a session guard and API client share.

use std::sync::Arc;

use crate::credential::{self, Session, is_well_formed_token};
use crate::navigator::Navigator;
use crate::role::Role;
use crate::storage::{
    ACCESS_TOKEN_KEY, CSRF_COOKIE, KeyValueStore, SESSION_COOKIE, USER_ID_KEY, USER_ROLE_KEY, USERNAME_KEY,
};

/// Header carrying the CSRF cookie value back to the server.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Persistent storage, session storage, cookies and location of one page.
/// Cloning shares the underlying stores.
#[derive(Clone)]
pub struct BrowserContext {
    pub local: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
    pub cookies: Arc<dyn KeyValueStore>,
    pub navigator: Arc<dyn Navigator>,
}

impl BrowserContext {
    #[must_use]
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        cookies: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self { local, session, cookies, navigator }
    }

    /// Stored bearer token, only if it is well formed.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.local.get(ACCESS_TOKEN_KEY).filter(|t| is_well_formed_token(t))
    }

    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.cookies.get(SESSION_COOKIE).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        self.cookies.get(CSRF_COOKIE).filter(|v| !v.is_empty())
    }

    /// Any of: well-formed token, session cookie, CSRF token.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.bearer_token().is_some() || self.session_cookie().is_some() || self.csrf_token().is_some()
    }

    /// Cached session fields. `None` without a credential or a stored user id.
    #[must_use]
    pub fn cached_session(&self) -> Option<Session> {
        if !self.has_credential() {
            return None;
        }
        let user_id = self.local.get(USER_ID_KEY)?;
        Some(Session {
            role: self.local.get(USER_ROLE_KEY).as_deref().and_then(Role::parse),
            user_id,
            username: self.local.get(USERNAME_KEY).unwrap_or_default(),
        })
    }

    /// Bearer and CSRF headers.
    #[must_use]
    pub fn auth_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(3);
        if let Some(token) = self.bearer_token() {
            headers.push(("Authorization", format!("Bearer {token}")));
        }
        if let Some(csrf) = self.csrf_token() {
            headers.push((CSRF_HEADER, csrf));
        }
        headers
    }

    /// Auth headers plus the `Cookie` header, as attached to every API request.
    #[must_use]
    pub fn request_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = self.auth_headers();
        if let Some(cookie) = credential::cookie_header(&self.cookies.entries()) {
            headers.push(("Cookie", cookie));
        }
        headers
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
