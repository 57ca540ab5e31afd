//! Session guard: credential detection, verification, login/logout and
//! role-based routing for every dashboard on a page.
//!
//! ARCHITECTURE
//! ============
//! Constructed once per page and shared as `Arc<SessionGuard>` with each
//! dashboard controller, which gates its `init()` on [`SessionGuard::check_auth`]
//! and [`SessionGuard::require_role`]. Server calls go through [`AuthApi`]
//! so the guard can run against a stub backend.
//!
//! STATE
//! =====
//! `Unauthenticated --login--> Authenticated(role) --logout | token invalid--> Unauthenticated`.
//! There is no partial-auth state; the cached session is ignored whenever
//! no credential is present.
//!
//! TRADE-OFFS
//! ==========
//! Verification failures are fail-closed on protected routes, but a locally
//! present credential skips verification entirely. That asymmetry lives in
//! [`LocalCredentialPolicy`] alone so it can be tightened without touching
//! the rest of the guard.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::context::BrowserContext;
use crate::credential::{Session, UserData, is_well_formed_token};
use crate::error::ClientError;
use crate::role::{Role, route_for};
use crate::storage::{ACCESS_TOKEN_KEY, USER_DATA_KEY, USER_ID_KEY, USER_ROLE_KEY, USERNAME_KEY};

/// Successful credential-exchange payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    /// Bearer token. Absent when the backend authenticates by session cookie only.
    #[serde(default, alias = "access_token", alias = "token")]
    pub access: Option<String>,
    pub user: UserData,
}

/// Authentication endpoints the guard depends on. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange username and password for a credential.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the request fails or the server rejects it.
    async fn exchange_credentials(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError>;

    /// Ask the server who the current credential belongs to.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the request fails or the session is not valid.
    async fn verify(&self) -> Result<UserData, ClientError>;

    /// Invalidate the session server-side.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the request fails.
    async fn logout(&self) -> Result<(), ClientError>;
}

/// Whether a locally present credential may skip server verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalCredentialPolicy {
    /// Any local credential is trusted without a round-trip.
    #[default]
    TrustLocal,
    /// Always verify with the server.
    AlwaysVerify,
}

impl LocalCredentialPolicy {
    #[must_use]
    pub fn short_circuits(self, ctx: &BrowserContext) -> bool {
        match self {
            Self::TrustLocal => ctx.has_credential(),
            Self::AlwaysVerify => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(Option<Role>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success { data: UserData },
    Failure { error: String },
}

pub struct SessionGuard {
    ctx: BrowserContext,
    api: Arc<dyn AuthApi>,
    config: ClientConfig,
}

impl SessionGuard {
    #[must_use]
    pub fn new(ctx: BrowserContext, api: Arc<dyn AuthApi>, config: &ClientConfig) -> Self {
        Self { ctx, api, config: config.clone() }
    }

    #[must_use]
    pub fn context(&self) -> &BrowserContext {
        &self.ctx
    }

    /// Well-formed token, session cookie, or CSRF token present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.ctx.has_credential()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated(self.role())
        } else {
            AuthState::Unauthenticated
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.ctx.cached_session()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session().and_then(|s| s.role)
    }

    #[must_use]
    pub fn auth_headers(&self) -> Vec<(&'static str, String)> {
        self.ctx.auth_headers()
    }

    /// Decide whether the page may initialise.
    ///
    /// Returns `false` only after redirecting a visitor without a valid
    /// session away from a protected route.
    pub async fn check_auth(&self) -> bool {
        if self.config.local_policy.short_circuits(&self.ctx) {
            debug!("local credential present, skipping verification");
            return true;
        }

        match self.api.verify().await {
            Ok(user) => {
                if let Err(e) = self.persist_user(&user) {
                    warn!(error = %e, "could not cache verified session");
                }
                info!(user_id = %user.id, "session verified");
                true
            }
            Err(e) => {
                if matches!(e, ClientError::Auth { .. }) {
                    self.clear();
                }
                let path = self.ctx.navigator.current_path();
                if self.config.is_protected(&path) {
                    warn!(error = %e, %path, "verification failed on protected route");
                    self.ctx.navigator.navigate(&self.config.login_route);
                    false
                } else {
                    debug!(error = %e, %path, "verification failed on public route");
                    true
                }
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let response = match self.api.exchange_credentials(username, password).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), %username, "login failed");
                return LoginOutcome::Failure { error: e.user_message() };
            }
        };

        if let Err(e) = self.persist_login(&response) {
            error!(error = %e, "could not persist credential");
            return LoginOutcome::Failure { error: e.user_message() };
        }
        info!(%username, role = ?response.user.role, "login succeeded");
        LoginOutcome::Success { data: response.user }
    }

    /// Best-effort server logout, then wipe every store and go to login.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "server logout failed, clearing locally");
        }
        self.wipe();
        self.ctx.navigator.navigate(&self.config.login_route);
    }

    /// Forced logout after the server rejected the credential mid-page.
    pub fn handle_auth_failure(&self) {
        warn!("credential rejected, forcing logout");
        self.wipe();
        self.ctx.navigator.navigate(&self.config.login_route);
    }

    pub fn redirect_based_on_role(&self) {
        self.ctx.navigator.navigate(route_for(self.role()));
    }

    /// True when the cached role is one of `allowed`; otherwise sends the
    /// visitor to their own dashboard.
    pub fn require_role(&self, allowed: &[Role]) -> bool {
        match self.role() {
            Some(role) if allowed.contains(&role) => true,
            other => {
                info!(role = ?other, "role not permitted on this page");
                self.redirect_based_on_role();
                false
            }
        }
    }

    /// Drop the credential and cached session fields. No redirect.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, USER_DATA_KEY, USER_ROLE_KEY, USER_ID_KEY, USERNAME_KEY] {
            if let Err(e) = self.ctx.local.remove(key) {
                error!(error = %e, key, "could not remove stored key");
            }
        }
    }

    fn wipe(&self) {
        let stores = [("local", &self.ctx.local), ("session", &self.ctx.session), ("cookies", &self.ctx.cookies)];
        for (name, store) in stores {
            if let Err(e) = store.clear() {
                error!(error = %e, store = name, "could not clear store");
            }
        }
    }

    fn persist_login(&self, response: &LoginResponse) -> Result<(), ClientError> {
        if let Some(token) = &response.access {
            if !is_well_formed_token(token) {
                warn!("login returned a token that is not three dot-separated segments");
            }
            self.ctx.local.set(ACCESS_TOKEN_KEY, token)?;
        }
        self.persist_user(&response.user)
    }

    fn persist_user(&self, user: &UserData) -> Result<(), ClientError> {
        let local = &self.ctx.local;
        let session = Session::from(user);
        local.set(USER_DATA_KEY, &serde_json::to_string(user)?)?;
        local.set(USER_ID_KEY, &session.user_id)?;
        local.set(USERNAME_KEY, &session.username)?;
        match session.role {
            Some(role) => local.set(USER_ROLE_KEY, role.code())?,
            None => local.remove(USER_ROLE_KEY)?,
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
