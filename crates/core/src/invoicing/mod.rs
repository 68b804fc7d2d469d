//! Monthly pratica invoicing.
//!
//! This module provides:
//! - Get-or-create and finalization of per-period aggregates
//! - Booking attachment with explicit step policies
//! - Retry of failed attachments
//! - Query operations over invoices, praticas and the audit log

mod aggregate;
mod audit;
mod error;
mod finalization;
mod orchestrator;
mod repository;
mod retry;
mod service;
mod steps;
mod types;

#[cfg(test)]
mod testing;

pub use aggregate::MonthlyAggregateManager;
pub use audit::{SYSTEM_ACTOR, actions};
pub use error::{InvoicingError, RepositoryError};
pub use finalization::{FinalizationController, parse_period};
pub use orchestrator::BookingAttachmentOrchestrator;
pub use repository::{
    AuditLogRepository, InsertOutcome, InvoiceRepository, InvoiceRuleRepository, InvoicingStore,
    PraticaRepository,
};
pub use retry::{DEFAULT_MAX_RETRIES, RETRY_TRIGGER, RetryDriver};
pub use service::{DEFAULT_TRIGGER, InvoicingService};
pub use steps::{AttachmentStep, StepPolicy};
pub use types::{
    AttachOutcome, AuditEntityType, AuditLogEntry, Invoice, InvoiceDetail, InvoiceFilter,
    InvoiceLineItem, InvoiceStatus, InvoiceType, MonthlyPratica, NewAuditEntry, NewInvoice,
    NewLineItem, NewPratica, PraticaFilter, PraticaStatus, RemoteAggregateRef, RetryFailure,
    RetryReport,
};
