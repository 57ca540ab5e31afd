//! Role dashboards.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each controller gates `init()` on the shared session guard, then loads
//! its widgets on every scheduler tick. Controllers expose plain data; how
//! it is drawn is someone else's problem.
//!
//! ERROR HANDLING
//! ==============
//! A failed fetch only affects its own widget:
//! - 401 anywhere, or 403 on the page's primary resource or a user action:
//!   forced logout.
//! - 403 on a secondary widget: the widget is `Locked`.
//! - Malformed payload: logged, previous widget state kept.
//! - Anything else: the widget is `Failed` and a notice is raised.
//!
//! No failure escapes `refresh()`.

pub mod admin;
pub mod cashier;
pub mod waiter;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::ClientError;
use crate::role::Role;
use crate::session::SessionGuard;

/// Load state of one dashboard section.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget<T> {
    Empty,
    Loaded(T),
    /// The caller may not see this section.
    Locked,
    Failed(String),
}

impl<T> Default for Widget<T> {
    fn default() -> Self {
        Widget::Empty
    }
}

impl<T> Widget<T> {
    #[must_use]
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Widget::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            Widget::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Message raised for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Notices {
    inner: Mutex<Vec<Notice>>,
}

impl Notices {
    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) {
        lock(&self.inner).push(Notice { level, message: message.into() });
    }

    /// Take every pending notice, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *lock(&self.inner))
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared `init()` gate: session first, then role.
pub(crate) async fn gate(guard: &SessionGuard, roles: &[Role]) -> bool {
    guard.check_auth().await && guard.require_role(roles)
}

/// What a fetch result does to its widget.
#[derive(Debug)]
pub(crate) enum Settled<T> {
    Update(Widget<T>),
    Keep,
    SignOut,
}

pub(crate) fn settle<T>(widget: &str, result: Result<T, ClientError>, primary: bool) -> Settled<T> {
    let e = match result {
        Ok(value) => return Settled::Update(Widget::Loaded(value)),
        Err(e) => e,
    };
    warn!(widget, error = %e, code = e.error_code(), "widget fetch failed");
    match e {
        ClientError::Auth { .. } => Settled::SignOut,
        ClientError::Permission(_) if primary => Settled::SignOut,
        ClientError::Permission(_) => Settled::Update(Widget::Locked),
        ClientError::Validation(_) => Settled::Keep,
        other => Settled::Update(Widget::Failed(other.user_message())),
    }
}

/// Store a settled result. Returns `true` when the page must sign out.
pub(crate) fn apply<T>(slot: &mut Widget<T>, settled: Settled<T>, notices: &Notices) -> bool {
    match settled {
        Settled::Update(widget) => {
            if let Widget::Failed(message) = &widget {
                notices.push(NoticeLevel::Error, message.clone());
            }
            *slot = widget;
            false
        }
        Settled::Keep => false,
        Settled::SignOut => true,
    }
}

/// Report a failed user action (button press, not a poll). Actions are
/// top-level requests, so a 403 signs out like a 401.
pub(crate) fn report_action_error(guard: &SessionGuard, notices: &Notices, action: &str, e: &ClientError) {
    warn!(action, error = %e, code = e.error_code(), "action failed");
    if matches!(e, ClientError::Auth { .. } | ClientError::Permission(_)) {
        guard.handle_auth_failure();
    } else {
        notices.push(NoticeLevel::Error, e.user_message());
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
