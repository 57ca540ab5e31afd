//! Client failure taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Failures are caught at the call site nearest the network request and
//! turned into a log line or a user-facing notice. Only `Auth` is allowed to
//! change the page: it forces a logout and a redirect to login.

use crate::storage::StorageError;

/// Fallback message shown when the request never reached the server.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

const NO_DETAIL: &str = "no detail from server";

/// Errors produced by client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure (`status: None`) or an unclassified non-2xx response.
    /// `message` is the server's own text, or the transport error for logs.
    #[error("network failure (status {status:?}): {}", .message.as_deref().unwrap_or(NO_DETAIL))]
    Network { status: Option<u16>, message: Option<String> },

    /// The server rejected the credential (401).
    #[error("authentication failed ({status}): {}", .message.as_deref().unwrap_or(NO_DETAIL))]
    Auth { status: u16, message: Option<String> },

    /// The caller is authenticated but not allowed to see this resource (403).
    #[error("permission denied: {0}")]
    Permission(String),

    /// Malformed request or response payload.
    #[error("invalid data: {0}")]
    Validation(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),

    /// Persistent storage could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Classify a non-2xx HTTP status, keeping the server-supplied message when there is one.
    #[must_use]
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            401 => Self::Auth { status, message },
            403 => Self::Permission(message.unwrap_or_else(|| request_failed_message(status))),
            400 | 422 => Self::Validation(message.unwrap_or_else(|| request_failed_message(status))),
            _ => Self::Network { status: Some(status), message },
        }
    }

    /// Stable machine-readable code for logs.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Network { .. } => "E_NETWORK",
            Self::Auth { .. } => "E_AUTH",
            Self::Permission(_) => "E_PERMISSION",
            Self::Validation(_) => "E_VALIDATION",
            Self::Config(_) => "E_CONFIG",
            Self::Storage(_) => "E_STORAGE",
        }
    }

    /// Whether resending the same request may succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Network { status: None | Some(429 | 500..=599), .. })
    }

    /// Message suitable for a notice: the server's text when it sent one,
    /// otherwise the generic network-error text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { status: None, .. } => NETWORK_ERROR_MESSAGE.to_owned(),
            Self::Network { message, .. } | Self::Auth { message, .. } => {
                message.clone().unwrap_or_else(|| NETWORK_ERROR_MESSAGE.to_owned())
            }
            Self::Permission(message) | Self::Validation(message) | Self::Config(message) => message.clone(),
            Self::Storage(e) => e.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::Validation(e.to_string());
        }
        match e.status() {
            Some(status) => Self::from_status(status.as_u16(), None),
            None => Self::Network { status: None, message: Some(e.to_string()) },
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.to_string())
    }
}

fn request_failed_message(status: u16) -> String {
    format!("request failed: {status}")
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
