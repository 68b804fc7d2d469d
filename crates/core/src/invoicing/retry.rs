//! Retry driver for failed attachments.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::audit::{AuditEvent, actions};
use super::error::InvoicingError;
use super::orchestrator::BookingAttachmentOrchestrator;
use super::repository::InvoicingStore;
use super::types::{AuditEntityType, InvoiceStatus, RetryFailure, RetryReport};
use crate::accounting::AccountingApi;
use crate::booking::BookingSource;

/// Trigger recorded on invoices created by a retry pass.
pub const RETRY_TRIGGER: &str = "retry";

/// Default retry ceiling for manual passes.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// Re-drives failed invoices from scratch.
pub struct RetryDriver<S: InvoicingStore, A: AccountingApi, B: BookingSource> {
    store: Arc<S>,
    orchestrator: Arc<BookingAttachmentOrchestrator<S, A, B>>,
}

impl<S: InvoicingStore, A: AccountingApi, B: BookingSource> RetryDriver<S, A, B> {
    /// Create a new retry driver.
    #[must_use]
    pub fn new(store: Arc<S>, orchestrator: Arc<BookingAttachmentOrchestrator<S, A, B>>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Deletes every failed invoice below the retry ceiling and attaches its
    /// booking again with an incremented retry count, oldest first.
    ///
    /// Per-booking failures go into the report; only the initial query can
    /// fail the whole pass.
    ///
    /// # Errors
    ///
    /// Returns a repository error if the failed invoices cannot be listed.
    pub async fn retry_failed(&self, max_retries: i32) -> Result<RetryReport, InvoicingError> {
        let candidates = self.store.list_failed(max_retries).await?;
        info!(count = candidates.len(), max_retries, "Starting retry pass");

        let mut report = RetryReport::default();
        for invoice in candidates {
            let booking_id = invoice.booking_id;

            if let Err(err) = self.store.delete_invoice(invoice.id).await {
                warn!(booking_id, invoice_id = %invoice.id, error = %err, "Could not delete failed invoice");
                report.failed.push(RetryFailure {
                    booking_id,
                    error: err.to_string(),
                });
                continue;
            }

            AuditEvent::new(
                AuditEntityType::Invoice,
                invoice.id.into_inner(),
                actions::INVOICE_DELETED_FOR_RETRY,
            )
            .transition(Some(invoice.status.as_str()), None)
            .details(json!({
                "booking_id": booking_id,
                "retry_count": invoice.retry_count,
                "error_message": invoice.error_message,
            }))
            .actor(RETRY_TRIGGER)
            .record(self.store.as_ref())
            .await;

            match self
                .orchestrator
                .attach(booking_id, RETRY_TRIGGER, invoice.retry_count + 1)
                .await
            {
                Ok(outcome) if outcome.status == InvoiceStatus::Sent => {
                    report.success.push(booking_id);
                }
                Ok(outcome) => report.failed.push(RetryFailure {
                    booking_id,
                    error: format!("invoice {} is {}", outcome.invoice_id, outcome.status),
                }),
                Err(err) => report.failed.push(RetryFailure {
                    booking_id,
                    error: err.to_string(),
                }),
            }
        }

        info!(
            succeeded = report.success.len(),
            failed = report.failed.len(),
            "Retry pass finished"
        );
        Ok(report)
    }
}
