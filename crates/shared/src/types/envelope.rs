//! Uniform response envelope returned by every public operation.

use serde::{Deserialize, Serialize};

/// `{ success, data?, error?, count? }`.
///
/// List operations set `count`; failures carry only `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of items for list operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl<T> ApiEnvelope<T> {
    /// Successful single-value response.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            count: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            count: None,
        }
    }
}

impl<T> ApiEnvelope<Vec<T>> {
    /// Successful list response with `count`.
    #[must_use]
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self {
            success: true,
            data: Some(items),
            error: None,
            count: Some(count),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ApiEnvelope<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}
