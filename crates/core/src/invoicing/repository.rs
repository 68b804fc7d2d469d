//! Repository traits for invoicing persistence.
//!
//! These traits are implemented by the db crate to provide actual database operations.

use chrono::{DateTime, Utc};
use pratica_shared::types::{InvoiceId, MonthlyPraticaId, YearMonth};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::error::RepositoryError;
use super::types::{
    AuditEntityType, AuditLogEntry, Invoice, InvoiceFilter, InvoiceLineItem, InvoiceType,
    MonthlyPratica, NewAuditEntry, NewInvoice, NewLineItem, NewPratica, PraticaFilter,
    RemoteAggregateRef,
};
use crate::period::InvoiceRule;

/// Result of an insert guarded by a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The row was inserted.
    Inserted(T),
    /// A row with the same unique key already exists.
    Conflict,
}

/// Persistence of monthly praticas.
pub trait PraticaRepository: Send + Sync {
    /// Find the pratica of a period.
    fn find_pratica(
        &self,
        year_month: YearMonth,
    ) -> impl std::future::Future<Output = Result<Option<MonthlyPratica>, RepositoryError>> + Send;

    /// Insert an `open` pratica with zero totals.
    fn insert_pratica(
        &self,
        input: NewPratica,
    ) -> impl std::future::Future<Output = Result<InsertOutcome<MonthlyPratica>, RepositoryError>> + Send;

    /// Store the remote identity of a pratica.
    fn set_remote(
        &self,
        id: MonthlyPraticaId,
        remote: RemoteAggregateRef,
    ) -> impl std::future::Future<Output = Result<MonthlyPratica, RepositoryError>> + Send;

    /// Flip a pratica to `finalized`.
    fn mark_finalized(
        &self,
        id: MonthlyPraticaId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<MonthlyPratica, RepositoryError>> + Send;

    /// Overwrite the cached totals.
    fn update_totals(
        &self,
        id: MonthlyPraticaId,
        total_amount: Decimal,
        booking_count: i32,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List praticas, newest period first.
    fn list_praticas(
        &self,
        filter: PraticaFilter,
    ) -> impl std::future::Future<Output = Result<Vec<MonthlyPratica>, RepositoryError>> + Send;
}

/// Persistence of invoices and their line items.
pub trait InvoiceRepository: Send + Sync {
    /// Find the invoice of a booking by type.
    fn find_invoice(
        &self,
        booking_id: i64,
        invoice_type: InvoiceType,
    ) -> impl std::future::Future<Output = Result<Option<Invoice>, RepositoryError>> + Send;

    /// Find an invoice by id.
    fn find_invoice_by_id(
        &self,
        id: InvoiceId,
    ) -> impl std::future::Future<Output = Result<Option<Invoice>, RepositoryError>> + Send;

    /// Insert a `pending` invoice.
    fn insert_invoice(
        &self,
        input: NewInvoice,
    ) -> impl std::future::Future<Output = Result<InsertOutcome<Invoice>, RepositoryError>> + Send;

    /// Mark an invoice `sent`.
    fn mark_sent(
        &self,
        id: InvoiceId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Invoice, RepositoryError>> + Send;

    /// Mark an invoice `failed` with a message.
    fn mark_failed(
        &self,
        id: InvoiceId,
        error_message: String,
    ) -> impl std::future::Future<Output = Result<Invoice, RepositoryError>> + Send;

    /// Delete an invoice and its line items. Returns false if it did not exist.
    fn delete_invoice(
        &self,
        id: InvoiceId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Insert a line item.
    fn insert_line_item(
        &self,
        input: NewLineItem,
    ) -> impl std::future::Future<Output = Result<InvoiceLineItem, RepositoryError>> + Send;

    /// Line items of an invoice, oldest first.
    fn line_items(
        &self,
        invoice_id: InvoiceId,
    ) -> impl std::future::Future<Output = Result<Vec<InvoiceLineItem>, RepositoryError>> + Send;

    /// Sum and count of `sent` invoices linked to a pratica.
    fn sent_totals(
        &self,
        pratica_id: MonthlyPraticaId,
    ) -> impl std::future::Future<Output = Result<(Decimal, i64), RepositoryError>> + Send;

    /// `failed` invoices with `retry_count < max_retries`, oldest first.
    fn list_failed(
        &self,
        max_retries: i32,
    ) -> impl std::future::Future<Output = Result<Vec<Invoice>, RepositoryError>> + Send;

    /// Filtered, paginated invoice list, newest first.
    fn list_invoices(
        &self,
        filter: InvoiceFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Invoice>, RepositoryError>> + Send;

    /// All invoices of a booking.
    fn invoices_for_booking(
        &self,
        booking_id: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Invoice>, RepositoryError>> + Send;
}

/// Append-only audit log.
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry.
    fn append(
        &self,
        entry: NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<AuditLogEntry, RepositoryError>> + Send;

    /// Entries of an entity, oldest first.
    fn entries_for(
        &self,
        entity_type: AuditEntityType,
        entity_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<AuditLogEntry>, RepositoryError>> + Send;
}

/// Read access to invoice rules.
pub trait InvoiceRuleRepository: Send + Sync {
    /// Active rules.
    fn active_rules(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<InvoiceRule>, RepositoryError>> + Send;
}

/// Everything the invoicing services persist.
pub trait InvoicingStore:
    PraticaRepository + InvoiceRepository + AuditLogRepository + InvoiceRuleRepository
{
}

impl<T> InvoicingStore for T where
    T: PraticaRepository + InvoiceRepository + AuditLogRepository + InvoiceRuleRepository
{
}
