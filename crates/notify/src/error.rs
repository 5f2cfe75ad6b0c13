//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when talking to the chat platform.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Non-success HTTP status
    #[error("{method} returned {status}: {body}")]
    Status {
        method: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// API answered `ok: false`
    #[error("{method} failed: {error}")]
    Api { method: &'static str, error: String },

    /// API answered `ok: true` without a field we rely on
    #[error("{method} response missing {field}")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },

    /// No chat user is registered with the email
    #[error("No chat user found for {0}")]
    UserNotFound(String),
}
