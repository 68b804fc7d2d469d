//! In-memory fakes for invoicing tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use pratica_shared::types::{
    AuditLogId, InvoiceId, LineItemId, MonthlyPraticaId, YearMonth,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use super::error::RepositoryError;
use super::repository::{
    AuditLogRepository, InsertOutcome, InvoiceRepository, InvoiceRuleRepository,
    PraticaRepository,
};
use super::types::{
    AuditEntityType, AuditLogEntry, Invoice, InvoiceFilter, InvoiceLineItem, InvoiceStatus,
    InvoiceType, MonthlyPratica, NewAuditEntry, NewInvoice, NewLineItem, NewPratica,
    PraticaFilter, PraticaStatus, RemoteAggregateRef,
};
use crate::accounting::{
    AccountingApi, NewAccount, NewAggregate, NewPassenger, NewPaymentMovement, NewPricingLine,
    NewService, RemoteAccount, RemoteAggregate, RemoteAggregateStatus, RemoteCallError,
    RemotePassenger, RemotePaymentMovement, RemotePeriodCode, RemotePricingLine, RemoteService,
};
use crate::booking::{Booking, BookingSource};
use crate::period::InvoiceRule;

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub(crate) struct InMemoryStore {
    praticas: Mutex<HashMap<MonthlyPraticaId, MonthlyPratica>>,
    invoices: Mutex<HashMap<InvoiceId, Invoice>>,
    line_items: Mutex<Vec<InvoiceLineItem>>,
    audit: Mutex<Vec<AuditLogEntry>>,
    rules: Mutex<Vec<InvoiceRule>>,
    racing_invoice: Mutex<Option<Invoice>>,
    fail_mark_sent: AtomicBool,
    fail_delete: AtomicBool,
}

impl InMemoryStore {
    pub(crate) fn with_rules(rules: Vec<InvoiceRule>) -> Self {
        let store = Self::default();
        *store.rules.lock().unwrap() = rules;
        store
    }

    pub(crate) fn pratica_count(&self) -> usize {
        self.praticas.lock().unwrap().len()
    }

    pub(crate) fn pratica(&self, year_month: &str) -> Option<MonthlyPratica> {
        let ym: YearMonth = year_month.parse().unwrap();
        self.praticas
            .lock()
            .unwrap()
            .values()
            .find(|p| p.year_month == ym)
            .cloned()
    }

    pub(crate) fn invoice_count(&self) -> usize {
        self.invoices.lock().unwrap().len()
    }

    pub(crate) fn line_item_count(&self, invoice_id: InvoiceId) -> usize {
        self.line_items
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.invoice_id == invoice_id)
            .count()
    }

    pub(crate) fn audit_actions(&self) -> Vec<String> {
        self.audit
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }

    /// Makes the next invoice insert lose a race against `winner`.
    pub(crate) fn race_next_invoice_insert(&self, winner: Invoice) {
        *self.racing_invoice.lock().unwrap() = Some(winner);
    }

    /// Makes the next `mark_sent` fail with a database error.
    pub(crate) fn fail_next_mark_sent(&self) {
        self.fail_mark_sent.store(true, Ordering::SeqCst);
    }

    /// Makes the next `delete_invoice` fail with a database error.
    pub(crate) fn fail_next_delete(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    fn update_pratica<F: FnOnce(&mut MonthlyPratica)>(
        &self,
        id: MonthlyPraticaId,
        f: F,
    ) -> Result<MonthlyPratica, RepositoryError> {
        let mut praticas = self.praticas.lock().unwrap();
        let pratica = praticas
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("monthly pratica {id}")))?;
        f(pratica);
        pratica.updated_at = Utc::now();
        Ok(pratica.clone())
    }

    fn update_invoice<F: FnOnce(&mut Invoice)>(
        &self,
        id: InvoiceId,
        f: F,
    ) -> Result<Invoice, RepositoryError> {
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("invoice {id}")))?;
        f(invoice);
        invoice.updated_at = Utc::now();
        Ok(invoice.clone())
    }
}

impl PraticaRepository for InMemoryStore {
    async fn find_pratica(
        &self,
        year_month: YearMonth,
    ) -> Result<Option<MonthlyPratica>, RepositoryError> {
        Ok(self
            .praticas
            .lock()
            .unwrap()
            .values()
            .find(|p| p.year_month == year_month)
            .cloned())
    }

    async fn insert_pratica(
        &self,
        input: NewPratica,
    ) -> Result<InsertOutcome<MonthlyPratica>, RepositoryError> {
        let mut praticas = self.praticas.lock().unwrap();
        if praticas.values().any(|p| p.year_month == input.year_month) {
            return Ok(InsertOutcome::Conflict);
        }
        let now = Utc::now();
        let pratica = MonthlyPratica {
            id: MonthlyPraticaId::new(),
            year_month: input.year_month,
            remote_id: None,
            display_number: None,
            period_code: None,
            status: PraticaStatus::Open,
            total_amount: Decimal::ZERO,
            booking_count: 0,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
            finalized_at: None,
        };
        praticas.insert(pratica.id, pratica.clone());
        Ok(InsertOutcome::Inserted(pratica))
    }

    async fn set_remote(
        &self,
        id: MonthlyPraticaId,
        remote: RemoteAggregateRef,
    ) -> Result<MonthlyPratica, RepositoryError> {
        self.update_pratica(id, |p| {
            p.remote_id = Some(remote.remote_id);
            p.display_number = remote.display_number;
            p.period_code = Some(remote.period_code);
        })
    }

    async fn mark_finalized(
        &self,
        id: MonthlyPraticaId,
        at: DateTime<Utc>,
    ) -> Result<MonthlyPratica, RepositoryError> {
        self.update_pratica(id, |p| {
            p.status = PraticaStatus::Finalized;
            p.finalized_at = Some(at);
        })
    }

    async fn update_totals(
        &self,
        id: MonthlyPraticaId,
        total_amount: Decimal,
        booking_count: i32,
    ) -> Result<(), RepositoryError> {
        self.update_pratica(id, |p| {
            p.total_amount = total_amount;
            p.booking_count = booking_count;
        })
        .map(|_| ())
    }

    async fn list_praticas(
        &self,
        filter: PraticaFilter,
    ) -> Result<Vec<MonthlyPratica>, RepositoryError> {
        let mut rows: Vec<MonthlyPratica> = self
            .praticas
            .lock()
            .unwrap()
            .values()
            .filter(|p| filter.from.is_none_or(|from| p.year_month >= from))
            .filter(|p| filter.to.is_none_or(|to| p.year_month <= to))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.year_month.cmp(&a.year_month));
        Ok(rows)
    }
}

impl InvoiceRepository for InMemoryStore {
    async fn find_invoice(
        &self,
        booking_id: i64,
        invoice_type: InvoiceType,
    ) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .find(|i| i.booking_id == booking_id && i.invoice_type == invoice_type)
            .cloned())
    }

    async fn find_invoice_by_id(&self, id: InvoiceId) -> Result<Option<Invoice>, RepositoryError> {
        Ok(self.invoices.lock().unwrap().get(&id).cloned())
    }

    async fn insert_invoice(
        &self,
        input: NewInvoice,
    ) -> Result<InsertOutcome<Invoice>, RepositoryError> {
        let mut invoices = self.invoices.lock().unwrap();
        if let Some(winner) = self.racing_invoice.lock().unwrap().take() {
            invoices.insert(winner.id, winner);
            return Ok(InsertOutcome::Conflict);
        }
        if invoices
            .values()
            .any(|i| i.booking_id == input.booking_id && i.invoice_type == input.invoice_type)
        {
            return Ok(InsertOutcome::Conflict);
        }
        let now = Utc::now();
        let invoice = Invoice {
            id: InvoiceId::new(),
            pratica_id: Some(input.pratica_id),
            booking_id: input.booking_id,
            invoice_type: input.invoice_type,
            confirmation_code: input.confirmation_code,
            status: InvoiceStatus::Pending,
            total_amount: input.total_amount,
            currency: input.currency,
            customer_name: input.customer_name,
            customer_email: input.customer_email,
            seller_name: input.seller_name,
            booking_created_on: input.booking_created_on,
            error_message: None,
            retry_count: input.retry_count,
            triggered_by: input.triggered_by,
            created_at: now,
            updated_at: now,
            sent_at: None,
        };
        invoices.insert(invoice.id, invoice.clone());
        Ok(InsertOutcome::Inserted(invoice))
    }

    async fn mark_sent(&self, id: InvoiceId, at: DateTime<Utc>) -> Result<Invoice, RepositoryError> {
        if self.fail_mark_sent.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database("connection reset".to_string()));
        }
        self.update_invoice(id, |i| {
            i.status = InvoiceStatus::Sent;
            i.sent_at = Some(at);
            i.error_message = None;
        })
    }

    async fn mark_failed(
        &self,
        id: InvoiceId,
        error_message: String,
    ) -> Result<Invoice, RepositoryError> {
        self.update_invoice(id, |i| {
            i.status = InvoiceStatus::Failed;
            i.error_message = Some(error_message);
        })
    }

    async fn delete_invoice(&self, id: InvoiceId) -> Result<bool, RepositoryError> {
        if self.fail_delete.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Database("connection reset".to_string()));
        }
        let removed = self.invoices.lock().unwrap().remove(&id).is_some();
        self.line_items
            .lock()
            .unwrap()
            .retain(|l| l.invoice_id != id);
        Ok(removed)
    }

    async fn insert_line_item(&self, input: NewLineItem) -> Result<InvoiceLineItem, RepositoryError> {
        let item = InvoiceLineItem {
            id: LineItemId::new(),
            invoice_id: input.invoice_id,
            activity_id: input.activity_id,
            remote_service_id: input.remote_service_id,
            remote_pricing_line_id: input.remote_pricing_line_id,
            remote_payment_id: input.remote_payment_id,
            product_title: input.product_title,
            quantity: input.quantity,
            unit_price: input.unit_price,
            total_price: input.total_price,
            service_date: input.service_date,
            participant_count: input.participant_count,
            created_at: Utc::now(),
        };
        self.line_items.lock().unwrap().push(item.clone());
        Ok(item)
    }

    async fn line_items(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLineItem>, RepositoryError> {
        Ok(self
            .line_items
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn sent_totals(
        &self,
        pratica_id: MonthlyPraticaId,
    ) -> Result<(Decimal, i64), RepositoryError> {
        let invoices = self.invoices.lock().unwrap();
        let sent = invoices
            .values()
            .filter(|i| i.pratica_id == Some(pratica_id) && i.status == InvoiceStatus::Sent);
        let (sum, count) = sent.fold((Decimal::ZERO, 0_i64), |(sum, count), i| {
            (sum + i.total_amount, count + 1)
        });
        Ok((sum, count))
    }

    async fn list_failed(&self, max_retries: i32) -> Result<Vec<Invoice>, RepositoryError> {
        let mut rows: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.status == InvoiceStatus::Failed && i.retry_count < max_retries)
            .cloned()
            .collect();
        rows.sort_by_key(|i| (i.created_at, i.id));
        Ok(rows)
    }

    async fn list_invoices(&self, filter: InvoiceFilter) -> Result<Vec<Invoice>, RepositoryError> {
        let mut rows: Vec<Invoice> = self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| filter.from.is_none_or(|from| i.created_at.date_naive() >= from))
            .filter(|i| filter.to.is_none_or(|to| i.created_at.date_naive() <= to))
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .filter(|i| {
                filter.seller.as_deref().is_none_or(|seller| {
                    i.seller_name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(seller))
                })
            })
            .filter(|i| {
                filter
                    .confirmation_code
                    .as_deref()
                    .is_none_or(|code| i.confirmation_code == code)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let offset = usize::try_from(filter.page.offset()).unwrap();
        let limit = usize::try_from(filter.page.limit()).unwrap();
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn invoices_for_booking(&self, booking_id: i64) -> Result<Vec<Invoice>, RepositoryError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

impl AuditLogRepository for InMemoryStore {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, RepositoryError> {
        let row = AuditLogEntry {
            id: AuditLogId::new(),
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            action: entry.action.to_string(),
            old_status: entry.old_status,
            new_status: entry.new_status,
            details: entry.details,
            actor: entry.actor,
            created_at: Utc::now(),
        };
        self.audit.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn entries_for(
        &self,
        entity_type: AuditEntityType,
        entity_id: Uuid,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        Ok(self
            .audit
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

impl InvoiceRuleRepository for InMemoryStore {
    async fn active_rules(&self) -> Result<Vec<InvoiceRule>, RepositoryError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Remote accounting API
// ============================================================================

struct FailRule {
    op: &'static str,
    /// 1-based call number to fail; `None` fails every call.
    nth: Option<usize>,
}

#[derive(Default)]
pub(crate) struct FakeAccountingApi {
    calls: Mutex<Vec<&'static str>>,
    fail_rules: Mutex<Vec<FailRule>>,
    aggregates: Mutex<HashMap<String, RemoteAggregate>>,
    accounts: Mutex<HashMap<String, RemoteAccount>>,
    period_codes: Mutex<HashMap<String, RemotePeriodCode>>,
    next_id: AtomicUsize,
}

impl FakeAccountingApi {
    /// Fails the `nth` call (1-based) to `op`.
    pub(crate) fn fail_nth(&self, op: &'static str, nth: usize) {
        self.fail_rules
            .lock()
            .unwrap()
            .push(FailRule { op, nth: Some(nth) });
    }

    /// Fails every call to `op`.
    pub(crate) fn fail_always(&self, op: &'static str) {
        self.fail_rules.lock().unwrap().push(FailRule { op, nth: None });
    }

    pub(crate) fn clear_failures(&self) {
        self.fail_rules.lock().unwrap().clear();
    }

    pub(crate) fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == op).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn aggregate(&self, remote_id: &str) -> Option<RemoteAggregate> {
        self.aggregates.lock().unwrap().get(remote_id).cloned()
    }

    async fn enter(&self, op: &'static str) -> Result<String, RemoteCallError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(op);
            calls.iter().filter(|c| **c == op).count()
        };
        // Give concurrent callers a chance to interleave.
        tokio::task::yield_now().await;

        let should_fail = self
            .fail_rules
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.op == op && r.nth.is_none_or(|n| n == call_number));
        if should_fail {
            return Err(RemoteCallError::Status {
                status: 500,
                body: format!("{op} exploded"),
            });
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{op}-{n}"))
    }
}

impl AccountingApi for FakeAccountingApi {
    async fn create_aggregate(&self, request: NewAggregate) -> Result<RemoteAggregate, RemoteCallError> {
        let id = self.enter("create_aggregate").await?;
        let mut extra = serde_json::Map::new();
        extra.insert("agencyCode".into(), json!(request.agency_code));
        extra.insert("periodCodeId".into(), json!(request.period_code_id));
        extra.insert("internalNotes".into(), json!({"keep": "me"}));
        let aggregate = RemoteAggregate {
            display_number: Some(format!("N/{id}")),
            id: id.clone(),
            status: request.status,
            extra,
        };
        self.aggregates.lock().unwrap().insert(id, aggregate.clone());
        Ok(aggregate)
    }

    async fn get_aggregate(&self, remote_id: &str) -> Result<RemoteAggregate, RemoteCallError> {
        self.enter("get_aggregate").await?;
        self.aggregate(remote_id).ok_or(RemoteCallError::Status {
            status: 404,
            body: remote_id.to_string(),
        })
    }

    async fn update_aggregate_status(
        &self,
        remote_id: &str,
        status: RemoteAggregateStatus,
    ) -> Result<RemoteAggregate, RemoteCallError> {
        self.enter("update_aggregate_status").await?;
        let mut aggregates = self.aggregates.lock().unwrap();
        let aggregate = aggregates
            .get_mut(remote_id)
            .ok_or_else(|| RemoteCallError::Status {
                status: 404,
                body: remote_id.to_string(),
            })?;
        aggregate.status = status;
        Ok(aggregate.clone())
    }

    async fn find_account_by_external_key(
        &self,
        external_key: &str,
    ) -> Result<Option<RemoteAccount>, RemoteCallError> {
        self.enter("find_account").await?;
        Ok(self.accounts.lock().unwrap().get(external_key).cloned())
    }

    async fn create_account(&self, request: NewAccount) -> Result<RemoteAccount, RemoteCallError> {
        let id = self.enter("create_account").await?;
        let account = RemoteAccount {
            id,
            external_key: request.external_key.clone(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(request.external_key, account.clone());
        Ok(account)
    }

    async fn create_passenger(&self, _request: NewPassenger) -> Result<RemotePassenger, RemoteCallError> {
        let id = self.enter("create_passenger").await?;
        Ok(RemotePassenger { id })
    }

    async fn create_service(&self, _request: NewService) -> Result<RemoteService, RemoteCallError> {
        let id = self.enter("create_service").await?;
        Ok(RemoteService { id })
    }

    async fn create_pricing_line(
        &self,
        _request: NewPricingLine,
    ) -> Result<RemotePricingLine, RemoteCallError> {
        let id = self.enter("create_pricing_line").await?;
        Ok(RemotePricingLine { id })
    }

    async fn create_payment_movement(
        &self,
        _request: NewPaymentMovement,
    ) -> Result<RemotePaymentMovement, RemoteCallError> {
        let id = self.enter("create_payment_movement").await?;
        Ok(RemotePaymentMovement { id })
    }

    async fn get_or_create_period_code(&self, code: &str) -> Result<RemotePeriodCode, RemoteCallError> {
        let id = self.enter("period_code").await?;
        let mut codes = self.period_codes.lock().unwrap();
        let entry = codes.entry(code.to_string()).or_insert_with(|| RemotePeriodCode {
            id,
            code: code.to_string(),
        });
        Ok(entry.clone())
    }
}

// ============================================================================
// Booking source
// ============================================================================

#[derive(Default)]
pub(crate) struct StaticBookings {
    bookings: Mutex<HashMap<i64, Booking>>,
}

impl StaticBookings {
    pub(crate) fn insert(&self, booking: Booking) {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.booking_id, booking);
    }
}

impl BookingSource for StaticBookings {
    async fn find_booking(&self, booking_id: i64) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.bookings.lock().unwrap().get(&booking_id).cloned())
    }
}
