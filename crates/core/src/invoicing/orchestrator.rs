//! Booking attachment orchestrator.
//!
//! Attaching a booking runs a fixed sequence of remote calls against the
//! period's aggregate: account, passenger, then service / pricing line /
//! payment movement per billable activity. Remote records created before a
//! failure are left in place; the retry driver starts over with a fresh
//! invoice.

use std::sync::Arc;

use chrono::Utc;
use pratica_shared::AccountingProfile;
use pratica_shared::types::round_amount;
use serde_json::json;
use tracing::{error, info, warn};

use super::aggregate::MonthlyAggregateManager;
use super::audit::{AuditEvent, actions};
use super::error::{InvoicingError, RepositoryError};
use super::repository::{InsertOutcome, InvoicingStore};
use super::steps::{AttachmentStep, apply_policy};
use super::types::{
    AttachOutcome, AuditEntityType, Invoice, InvoiceStatus, InvoiceType, MonthlyPratica,
    NewInvoice, NewLineItem,
};
use crate::accounting::{
    AccountingApi, NewAccount, NewPassenger, NewPaymentMovement, NewPricingLine, NewService,
    RemoteCallError,
};
use crate::booking::{Activity, Booking, BookingSource, account_external_key, correlation_key};
use crate::period::resolve_period;

/// Runs the attachment of one booking to its monthly pratica.
pub struct BookingAttachmentOrchestrator<S: InvoicingStore, A: AccountingApi, B: BookingSource> {
    store: Arc<S>,
    api: Arc<A>,
    bookings: Arc<B>,
    aggregates: Arc<MonthlyAggregateManager<S, A>>,
    profile: AccountingProfile,
}

/// Remote context shared by every step of one attachment.
struct AttachContext<'a> {
    booking: &'a Booking,
    pratica: &'a MonthlyPratica,
    remote_id: &'a str,
    invoice: &'a Invoice,
    correlation_key: String,
}

impl<S: InvoicingStore, A: AccountingApi, B: BookingSource> BookingAttachmentOrchestrator<S, A, B> {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        api: Arc<A>,
        bookings: Arc<B>,
        aggregates: Arc<MonthlyAggregateManager<S, A>>,
        profile: AccountingProfile,
    ) -> Self {
        Self {
            store,
            api,
            bookings,
            aggregates,
            profile,
        }
    }

    /// Attaches a booking, or returns its existing invoice untouched.
    ///
    /// # Errors
    ///
    /// Returns `BookingNotFound`, `AlreadyFinalized`, the remote failure that
    /// prevented the aggregate from existing, `PartialAttachment` after the
    /// invoice was marked failed, or a repository error.
    pub async fn attach(
        &self,
        booking_id: i64,
        triggered_by: &str,
        retry_count: i32,
    ) -> Result<AttachOutcome, InvoicingError> {
        if let Some(existing) = self.store.find_invoice(booking_id, InvoiceType::Invoice).await? {
            info!(
                booking_id,
                invoice_id = %existing.id,
                status = %existing.status,
                "Booking already attached"
            );
            return Ok(AttachOutcome::existing(&existing));
        }

        let booking = self
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or(InvoicingError::BookingNotFound(booking_id))?;

        let rules = self.store.active_rules().await?;
        let period = resolve_period(&booking, &rules, Utc::now());
        info!(
            booking_id,
            year_month = %period.year_month,
            basis = %period.basis,
            fell_back = period.fell_back,
            "Resolved accounting period"
        );

        let _open = self.aggregates.hold_open(period.year_month).await;
        let pratica = self.aggregates.get_or_create(period.year_month).await?;
        let pratica = self.aggregates.ensure_remote(pratica).await?;
        let remote_id = pratica
            .remote_id
            .clone()
            .ok_or(InvoicingError::MissingRemoteAggregate(pratica.year_month))?;

        let new_invoice = self.new_invoice(&booking, &pratica, triggered_by, retry_count);
        let invoice = match self.store.insert_invoice(new_invoice).await? {
            InsertOutcome::Inserted(invoice) => invoice,
            InsertOutcome::Conflict => {
                let winner = self
                    .store
                    .find_invoice(booking_id, InvoiceType::Invoice)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound(format!("invoice for booking {booking_id}")))?;
                info!(booking_id, invoice_id = %winner.id, "Concurrent attachment won the insert");
                return Ok(AttachOutcome::existing(&winner));
            }
        };

        AuditEvent::new(AuditEntityType::Invoice, invoice.id.into_inner(), actions::INVOICE_CREATED)
            .transition(None, Some(InvoiceStatus::Pending.as_str()))
            .details(json!({
                "booking_id": booking_id,
                "year_month": pratica.year_month,
                "retry_count": retry_count,
            }))
            .actor(triggered_by)
            .record(self.store.as_ref())
            .await;

        let ctx = AttachContext {
            booking: &booking,
            pratica: &pratica,
            remote_id: &remote_id,
            invoice: &invoice,
            correlation_key: correlation_key(booking_id),
        };

        match self.run_steps(&ctx).await {
            Ok(line_count) => {
                let sent = match self.store.mark_sent(invoice.id, Utc::now()).await {
                    Ok(sent) => sent,
                    Err(err) => {
                        // Every remote record exists; a failed row is picked up by retry.
                        error!(
                            booking_id,
                            invoice_id = %invoice.id,
                            error = %err,
                            "Could not mark invoice sent"
                        );
                        if let Err(mark_err) = self
                            .store
                            .mark_failed(invoice.id, format!("marking sent failed: {err}"))
                            .await
                        {
                            warn!(
                                booking_id,
                                invoice_id = %invoice.id,
                                error = %mark_err,
                                "Invoice left pending"
                            );
                        }
                        return Err(err.into());
                    }
                };
                info!(
                    booking_id,
                    invoice_id = %sent.id,
                    pratica_id = %pratica.id,
                    line_items = line_count,
                    "Booking attached to monthly pratica"
                );
                AuditEvent::new(AuditEntityType::Invoice, sent.id.into_inner(), actions::INVOICE_SENT)
                    .transition(
                        Some(InvoiceStatus::Pending.as_str()),
                        Some(InvoiceStatus::Sent.as_str()),
                    )
                    .details(json!({ "line_items": line_count }))
                    .actor(triggered_by)
                    .record(self.store.as_ref())
                    .await;
                self.aggregates.recompute_totals(&pratica).await?;

                Ok(AttachOutcome {
                    invoice_id: sent.id,
                    pratica_id: sent.pratica_id,
                    status: sent.status,
                    already_attached: false,
                })
            }
            Err(err) => {
                error!(
                    booking_id,
                    invoice_id = %invoice.id,
                    error = %err,
                    "Booking attachment failed"
                );
                self.store.mark_failed(invoice.id, err.to_string()).await?;
                AuditEvent::new(AuditEntityType::Invoice, invoice.id.into_inner(), actions::INVOICE_FAILED)
                    .transition(
                        Some(InvoiceStatus::Pending.as_str()),
                        Some(InvoiceStatus::Failed.as_str()),
                    )
                    .details(json!({ "error": err.to_string(), "code": err.error_code() }))
                    .actor(triggered_by)
                    .record(self.store.as_ref())
                    .await;
                self.aggregates.recompute_totals(&pratica).await?;
                Err(err)
            }
        }
    }

    fn new_invoice(
        &self,
        booking: &Booking,
        pratica: &MonthlyPratica,
        triggered_by: &str,
        retry_count: i32,
    ) -> NewInvoice {
        NewInvoice {
            pratica_id: pratica.id,
            booking_id: booking.booking_id,
            invoice_type: InvoiceType::Invoice,
            confirmation_code: booking.confirmation_code.clone(),
            total_amount: round_amount(booking.total_amount),
            currency: self.currency_of(booking),
            customer_name: booking.customer.display_name(),
            customer_email: booking.customer.email.clone(),
            seller_name: booking.seller_name().map(str::to_string),
            booking_created_on: booking.created_at_utc().map(|at| at.date_naive()),
            retry_count,
            triggered_by: triggered_by.to_string(),
        }
    }

    fn currency_of(&self, booking: &Booking) -> String {
        booking
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.profile.default_currency.as_str())
            .to_uppercase()
    }

    /// Runs every remote step. Returns the number of line items written.
    async fn run_steps(&self, ctx: &AttachContext<'_>) -> Result<usize, InvoicingError> {
        let booking_id = ctx.booking.booking_id;

        let account_id = apply_policy(
            AttachmentStep::Account,
            booking_id,
            None,
            self.ensure_account(ctx.booking).await,
        )?;

        let customer = &ctx.booking.customer;
        apply_policy(
            AttachmentStep::Passenger,
            booking_id,
            None,
            self.api
                .create_passenger(NewPassenger {
                    pratica_id: ctx.remote_id.to_string(),
                    account_id,
                    first_name: customer.first_name.clone(),
                    last_name: customer.last_name.clone(),
                    email: customer.email.clone(),
                    booking_reference: ctx.correlation_key.clone(),
                })
                .await,
        )?;

        let mut written = 0;
        for (index, activity) in ctx.booking.billable_activities() {
            self.attach_activity(ctx, index, activity).await?;
            written += 1;
        }
        Ok(written)
    }

    async fn ensure_account(&self, booking: &Booking) -> Result<String, RemoteCallError> {
        let key = account_external_key(booking.customer.id);
        if let Some(account) = self.api.find_account_by_external_key(&key).await? {
            return Ok(account.id);
        }

        let created = self
            .api
            .create_account(NewAccount {
                external_key: key,
                first_name: booking.customer.first_name.clone(),
                last_name: booking.customer.last_name.clone(),
                email: booking.customer.email.clone(),
                agency_code: self.profile.agency_code.clone(),
            })
            .await?;
        Ok(created.id)
    }

    async fn attach_activity(
        &self,
        ctx: &AttachContext<'_>,
        index: usize,
        activity: &Activity,
    ) -> Result<(), InvoicingError> {
        let booking_id = ctx.booking.booking_id;
        let currency = ctx.invoice.currency.clone();
        let amount = round_amount(activity.total_price);
        // Service dates follow the aggregate, not the activity.
        let service_date = ctx.pratica.created_at.date_naive();

        let Some(service) = apply_policy(
            AttachmentStep::Service,
            booking_id,
            Some(index),
            self.api
                .create_service(NewService {
                    pratica_id: ctx.remote_id.to_string(),
                    supplier_code: self.profile.supplier_code.clone(),
                    service_type_code: self.profile.service_type_code.clone(),
                    description: activity.title.clone(),
                    start_date: service_date,
                    end_date: service_date,
                    quantity: activity.participant_count,
                    booking_reference: ctx.correlation_key.clone(),
                })
                .await,
        )?
        else {
            return Ok(());
        };

        let Some(pricing_line) = apply_policy(
            AttachmentStep::PricingLine,
            booking_id,
            Some(index),
            self.api
                .create_pricing_line(NewPricingLine {
                    pratica_id: ctx.remote_id.to_string(),
                    service_id: service.id.clone(),
                    description: activity.title.clone(),
                    quantity: 1,
                    unit_cost: amount,
                    unit_revenue: amount,
                    total_cost: amount,
                    total_revenue: amount,
                    currency: currency.clone(),
                })
                .await,
        )?
        else {
            return Ok(());
        };

        let Some(payment) = apply_policy(
            AttachmentStep::PaymentMovement,
            booking_id,
            Some(index),
            self.api
                .create_payment_movement(NewPaymentMovement {
                    pratica_id: ctx.remote_id.to_string(),
                    payment_type_code: self.profile.payment_type_code.clone(),
                    amount,
                    currency,
                    reference: ctx.correlation_key.clone(),
                    file_code: ctx.correlation_key.clone(),
                    operator_code: self.profile.operator_code.clone(),
                    movement_date: Utc::now().date_naive(),
                })
                .await,
        )?
        else {
            return Ok(());
        };

        self.store
            .insert_line_item(NewLineItem {
                invoice_id: ctx.invoice.id,
                activity_id: activity.id,
                remote_service_id: service.id,
                remote_pricing_line_id: pricing_line.id,
                remote_payment_id: payment.id,
                product_title: activity.title.clone(),
                quantity: 1,
                unit_price: amount,
                total_price: amount,
                service_date: Some(service_date),
                participant_count: activity.participant_count,
            })
            .await?;
        Ok(())
    }
}
