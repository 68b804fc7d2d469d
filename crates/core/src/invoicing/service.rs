//! Invoicing service facade.

use std::sync::Arc;

use pratica_shared::AccountingProfile;
use pratica_shared::types::InvoiceId;

use super::aggregate::MonthlyAggregateManager;
use super::error::InvoicingError;
use super::finalization::FinalizationController;
use super::orchestrator::BookingAttachmentOrchestrator;
use super::repository::InvoicingStore;
use super::retry::RetryDriver;
use super::types::{
    AttachOutcome, AuditEntityType, AuditLogEntry, Invoice, InvoiceDetail, InvoiceFilter,
    MonthlyPratica, PraticaFilter, RetryReport,
};
use crate::accounting::AccountingApi;
use crate::booking::BookingSource;

/// Trigger recorded when the caller does not name one.
pub const DEFAULT_TRIGGER: &str = "api";

/// Single entry point used by the HTTP layer and the binaries.
pub struct InvoicingService<S: InvoicingStore, A: AccountingApi, B: BookingSource> {
    store: Arc<S>,
    orchestrator: Arc<BookingAttachmentOrchestrator<S, A, B>>,
    retry: RetryDriver<S, A, B>,
    finalization: FinalizationController<S, A>,
}

impl<S: InvoicingStore, A: AccountingApi, B: BookingSource> InvoicingService<S, A, B> {
    /// Wires the invoicing components over the given dependencies.
    #[must_use]
    pub fn new(store: Arc<S>, api: Arc<A>, bookings: Arc<B>, profile: AccountingProfile) -> Self {
        let aggregates = Arc::new(MonthlyAggregateManager::new(
            Arc::clone(&store),
            Arc::clone(&api),
            profile.clone(),
        ));
        let orchestrator = Arc::new(BookingAttachmentOrchestrator::new(
            Arc::clone(&store),
            api,
            bookings,
            Arc::clone(&aggregates),
            profile,
        ));
        let retry = RetryDriver::new(Arc::clone(&store), Arc::clone(&orchestrator));
        let finalization = FinalizationController::new(aggregates);

        Self {
            store,
            orchestrator,
            retry,
            finalization,
        }
    }

    #[cfg(test)]
    pub(crate) fn aggregates(&self) -> &MonthlyAggregateManager<S, A> {
        self.finalization.aggregates()
    }

    /// Attaches a booking to its monthly pratica.
    pub async fn attach_booking(
        &self,
        booking_id: i64,
        triggered_by: Option<&str>,
    ) -> Result<AttachOutcome, InvoicingError> {
        let trigger = triggered_by
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TRIGGER);
        self.orchestrator.attach(booking_id, trigger, 0).await
    }

    /// Re-drives failed invoices.
    pub async fn retry_failed(&self, max_retries: i32) -> Result<RetryReport, InvoicingError> {
        if max_retries < 0 {
            return Err(InvoicingError::Validation(
                "max_retries must not be negative".to_string(),
            ));
        }
        self.retry.retry_failed(max_retries).await
    }

    /// Finalizes a `YYYY-MM` period.
    pub async fn finalize_period(&self, year_month: &str) -> Result<MonthlyPratica, InvoicingError> {
        self.finalization.finalize_period(year_month).await
    }

    /// Filtered invoice list.
    pub async fn list_invoices(&self, filter: InvoiceFilter) -> Result<Vec<Invoice>, InvoicingError> {
        check_range(filter.from, filter.to)?;
        Ok(self.store.list_invoices(filter).await?)
    }

    /// Filtered monthly pratica list.
    pub async fn list_praticas(
        &self,
        filter: PraticaFilter,
    ) -> Result<Vec<MonthlyPratica>, InvoicingError> {
        check_range(filter.from, filter.to)?;
        Ok(self.store.list_praticas(filter).await?)
    }

    /// Every invoice recorded for a booking.
    pub async fn invoices_for_booking(&self, booking_id: i64) -> Result<Vec<Invoice>, InvoicingError> {
        Ok(self.store.invoices_for_booking(booking_id).await?)
    }

    /// Invoice with its line items.
    pub async fn invoice_detail(&self, invoice_id: InvoiceId) -> Result<InvoiceDetail, InvoicingError> {
        let invoice = self
            .store
            .find_invoice_by_id(invoice_id)
            .await?
            .ok_or(InvoicingError::InvoiceNotFound(invoice_id))?;
        let line_items = self.store.line_items(invoice_id).await?;
        Ok(InvoiceDetail { invoice, line_items })
    }

    /// Audit entries of an invoice. Empty for unknown or deleted invoices.
    pub async fn invoice_audit_log(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<AuditLogEntry>, InvoicingError> {
        Ok(self
            .store
            .entries_for(AuditEntityType::Invoice, invoice_id.into_inner())
            .await?)
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(
    from: Option<T>,
    to: Option<T>,
) -> Result<(), InvoicingError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(InvoicingError::Validation(format!(
            "from ({from}) is after to ({to})"
        ))),
        _ => Ok(()),
    }
}
