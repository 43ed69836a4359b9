//! Typed outcome taxonomy for authorized requests.
//!
//! ERROR HANDLING
//! ==============
//! Every call site gets the same four failure kinds instead of inspecting
//! status codes itself. Only `Unauthorized` has a side effect (the session is
//! cleared before the error is returned); the rest leave the session alone.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

use serde_json::Value;

const MAX_MESSAGE_CHARS: usize = 300;

/// Failure of a request issued through `AuthorizedClient`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the request's authorization (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Any other 4xx: caller-correctable input problem.
    #[error("request rejected ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// 5xx or an unexpected status: collaborator failure.
    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Transport failure, timeout, or a response body that could not be decoded.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ApiError {
    /// Text to show the end user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "session expired, please sign in again".to_owned(),
            Self::ClientError { message, .. } => message.clone(),
            Self::ServerError { .. } => "the server could not complete the request, try again later".to_owned(),
            Self::NetworkError(_) => "could not reach the server, check your connection".to_owned(),
        }
    }

    /// Whether repeating the same request may succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ServerError { .. } | Self::NetworkError(_))
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Local rejection raised before any request is sent.
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::ClientError { status: 400, message: message.into() }
    }
}

/// Map a non-success status and its body to an error. Never called for 2xx.
pub(crate) fn classify_status(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::Unauthorized,
        400..=499 => ApiError::ClientError { status, message: error_message(status, body) },
        _ => ApiError::ServerError { status, message: error_message(status, body) },
    }
}

/// Human-readable message from an error body: the JSON `message` or `error`
/// field when present, otherwise the (truncated) raw text.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {status}");
    }
    if let Ok(json) = serde_json::from_str::<Value>(trimmed) {
        for field in ["message", "error"] {
            if let Some(text) = json.get(field).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_owned();
                }
            }
        }
    }
    trimmed.chars().take(MAX_MESSAGE_CHARS).collect()
}
