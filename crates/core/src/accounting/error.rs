//! Remote call errors.

use thiserror::Error;

/// Failure of a single call to the remote accounting API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteCallError {
    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status.
    #[error("remote returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// Response body did not match the expected schema.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Login failed or the token was rejected after a refresh.
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl RemoteCallError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "REMOTE_TRANSPORT",
            Self::Timeout => "REMOTE_TIMEOUT",
            Self::Status { .. } => "REMOTE_STATUS",
            Self::Decode(_) => "REMOTE_DECODE",
            Self::Auth(_) => "REMOTE_AUTH",
        }
    }
}
