//! Invoicing error types.

use pratica_shared::AppError;
use pratica_shared::types::{InvoiceId, YearMonth};
use thiserror::Error;

use super::steps::AttachmentStep;
use crate::accounting::RemoteCallError;

/// Errors raised by repository implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),

    /// A row expected to exist was not found.
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Errors that can occur during invoicing operations.
#[derive(Debug, Error)]
pub enum InvoicingError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Booking is not in the mirror.
    #[error("Booking not found: {0}")]
    BookingNotFound(i64),

    /// No monthly pratica for the period.
    #[error("Monthly pratica not found for {0}")]
    PraticaNotFound(YearMonth),

    /// Invoice not found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// The period is closed.
    #[error("Monthly pratica {0} is already finalized")]
    AlreadyFinalized(YearMonth),

    /// The local row has no remote aggregate yet.
    #[error("Monthly pratica {0} has no remote aggregate")]
    MissingRemoteAggregate(YearMonth),

    /// A remote call outside the per-activity sequence failed.
    #[error("Remote call '{step}' failed: {source}")]
    RemoteCall {
        /// Remote operation name.
        step: &'static str,
        /// Underlying failure.
        source: RemoteCallError,
    },

    /// A required step failed while attaching an activity.
    #[error("Attachment aborted at activity {activity_index}, step {step}: {source}")]
    PartialAttachment {
        /// Index of the activity in booking order.
        activity_index: usize,
        /// Failed step.
        step: AttachmentStep,
        /// Underlying failure.
        source: RemoteCallError,
    },

    /// Persistence failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl InvoicingError {
    /// Wraps a remote failure with the operation name.
    #[must_use]
    pub fn remote(step: &'static str, source: RemoteCallError) -> Self {
        Self::RemoteCall { step, source }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BookingNotFound(_) => "BOOKING_NOT_FOUND",
            Self::PraticaNotFound(_) => "PRATICA_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            Self::MissingRemoteAggregate(_) => "MISSING_REMOTE_AGGREGATE",
            Self::RemoteCall { .. } => "REMOTE_CALL_FAILED",
            Self::PartialAttachment { .. } => "PARTIAL_ATTACHMENT",
            Self::Repository(RepositoryError::NotFound(_)) => "NOT_FOUND",
            Self::Repository(RepositoryError::Database(_)) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::Validation(_) => 400,

            // 404 Not Found
            Self::BookingNotFound(_)
            | Self::PraticaNotFound(_)
            | Self::InvoiceNotFound(_)
            | Self::Repository(RepositoryError::NotFound(_)) => 404,

            // 409 Conflict - period state
            Self::AlreadyFinalized(_) | Self::MissingRemoteAggregate(_) => 409,

            // 502 Bad Gateway - remote back office
            Self::RemoteCall { .. } | Self::PartialAttachment { .. } => 502,

            // 500 Internal Server Error
            Self::Repository(RepositoryError::Database(_)) => 500,
        }
    }
}

impl From<InvoicingError> for AppError {
    fn from(err: InvoicingError) -> Self {
        let message = err.to_string();
        match err {
            InvoicingError::Validation(_) => Self::Validation(message),
            InvoicingError::BookingNotFound(_)
            | InvoicingError::PraticaNotFound(_)
            | InvoicingError::InvoiceNotFound(_)
            | InvoicingError::Repository(RepositoryError::NotFound(_)) => Self::NotFound(message),
            InvoicingError::AlreadyFinalized(_) => Self::AlreadyFinalized(message),
            InvoicingError::MissingRemoteAggregate(_) => Self::Conflict(message),
            InvoicingError::RemoteCall { .. } | InvoicingError::PartialAttachment { .. } => {
                Self::ExternalService(message)
            }
            InvoicingError::Repository(RepositoryError::Database(_)) => Self::Database(message),
        }
    }
}
