//! Remote attachment steps and their failure policy.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use super::error::InvoicingError;
use crate::accounting::RemoteCallError;

/// What a step failure means for the attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Failure aborts the attachment and marks the invoice failed.
    Required,
    /// Failure is logged and the sequence continues.
    BestEffort,
}

/// Remote steps of one booking attachment, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStep {
    /// Customer account get-or-create.
    Account,
    /// Passenger under the aggregate.
    Passenger,
    /// Service line for an activity.
    Service,
    /// Pricing line of the service.
    PricingLine,
    /// Payment movement for the activity.
    PaymentMovement,
}

impl AttachmentStep {
    /// Failure policy of the step.
    #[must_use]
    pub const fn policy(self) -> StepPolicy {
        match self {
            Self::Account | Self::Passenger => StepPolicy::BestEffort,
            Self::Service | Self::PricingLine | Self::PaymentMovement => StepPolicy::Required,
        }
    }

    /// Returns the string representation of the step.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Passenger => "passenger",
            Self::Service => "service",
            Self::PricingLine => "pricing_line",
            Self::PaymentMovement => "payment_movement",
        }
    }
}

impl fmt::Display for AttachmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Applies the step's policy to a remote result.
///
/// `Ok(None)` means a best-effort step failed and was skipped.
pub(crate) fn apply_policy<T>(
    step: AttachmentStep,
    booking_id: i64,
    activity_index: Option<usize>,
    result: Result<T, RemoteCallError>,
) -> Result<Option<T>, InvoicingError> {
    match (result, step.policy()) {
        (Ok(value), _) => Ok(Some(value)),
        (Err(source), StepPolicy::BestEffort) => {
            warn!(
                booking_id,
                step = %step,
                code = source.error_code(),
                error = %source,
                "Best-effort attachment step failed, continuing"
            );
            Ok(None)
        }
        (Err(source), StepPolicy::Required) => Err(match activity_index {
            Some(activity_index) => InvoicingError::PartialAttachment {
                activity_index,
                step,
                source,
            },
            None => InvoicingError::remote(step.as_str(), source),
        }),
    }
}
