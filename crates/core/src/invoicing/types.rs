//! Invoicing domain types.

use chrono::{DateTime, NaiveDate, Utc};
use pratica_shared::types::{
    AuditLogId, InvoiceId, LineItemId, MonthlyPraticaId, PageRequest, YearMonth,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Local status of a monthly pratica.
///
/// `Open -> Finalized` is the only transition; finalized is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PraticaStatus {
    /// Accepting attachments (remote `WP`).
    Open,
    /// Closed (remote `INS`).
    Finalized,
}

impl PraticaStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Finalized => "finalized",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }
}

impl fmt::Display for PraticaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a local invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Attachment in progress.
    Pending,
    /// Every required remote step succeeded.
    Sent,
    /// A required remote step failed.
    Failed,
}

impl InvoiceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of local invoice record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    /// Regular attachment of a booking.
    Invoice,
    /// Credit note.
    CreditNote,
}

impl InvoiceType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "INVOICE",
            Self::CreditNote => "CREDIT_NOTE",
        }
    }

    /// Parses a type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "INVOICE" => Some(Self::Invoice),
            "CREDIT_NOTE" => Some(Self::CreditNote),
            _ => None,
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local record of one period's shared remote aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyPratica {
    /// Local id.
    pub id: MonthlyPraticaId,
    /// Accounting period, unique.
    pub year_month: YearMonth,
    /// Remote identifier; `None` until the remote aggregate exists.
    pub remote_id: Option<String>,
    /// Remote display number.
    pub display_number: Option<String>,
    /// Period code registry entry.
    pub period_code: Option<String>,
    /// Local status.
    pub status: PraticaStatus,
    /// Sum of `sent` invoices.
    pub total_amount: Decimal,
    /// Number of `sent` invoices.
    pub booking_count: i32,
    /// Accounting defaults snapshot taken at creation.
    pub metadata: Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// Set when finalized.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl MonthlyPratica {
    /// Returns true once the period is closed.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.status == PraticaStatus::Finalized
    }
}

/// Input for inserting a monthly pratica row.
#[derive(Debug, Clone)]
pub struct NewPratica {
    /// Accounting period.
    pub year_month: YearMonth,
    /// Accounting defaults snapshot.
    pub metadata: Value,
}

/// Remote identity stored on a monthly pratica once created remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAggregateRef {
    /// Remote identifier.
    pub remote_id: String,
    /// Remote display number.
    pub display_number: Option<String>,
    /// Period code.
    pub period_code: String,
}

/// Local record of one booking's attachment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Local id.
    pub id: InvoiceId,
    /// Monthly pratica the booking was attached to.
    pub pratica_id: Option<MonthlyPraticaId>,
    /// Booking id.
    pub booking_id: i64,
    /// Record kind.
    pub invoice_type: InvoiceType,
    /// Booking confirmation code.
    pub confirmation_code: String,
    /// Attempt status.
    pub status: InvoiceStatus,
    /// Booking total, 2dp.
    pub total_amount: Decimal,
    /// Currency.
    pub currency: String,
    /// Customer display name.
    pub customer_name: String,
    /// Customer email.
    pub customer_email: Option<String>,
    /// Seller used for period resolution.
    pub seller_name: Option<String>,
    /// Booking creation date.
    pub booking_created_on: Option<NaiveDate>,
    /// Failure message of the last attempt.
    pub error_message: Option<String>,
    /// How many times the booking was re-driven.
    pub retry_count: i32,
    /// Who or what triggered the attempt.
    pub triggered_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// Set when the invoice reached `sent`.
    pub sent_at: Option<DateTime<Utc>>,
}

/// Input for inserting a pending invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    /// Monthly pratica.
    pub pratica_id: MonthlyPraticaId,
    /// Booking id.
    pub booking_id: i64,
    /// Record kind.
    pub invoice_type: InvoiceType,
    /// Booking confirmation code.
    pub confirmation_code: String,
    /// Booking total, 2dp.
    pub total_amount: Decimal,
    /// Currency.
    pub currency: String,
    /// Customer display name.
    pub customer_name: String,
    /// Customer email.
    pub customer_email: Option<String>,
    /// Seller.
    pub seller_name: Option<String>,
    /// Booking creation date.
    pub booking_created_on: Option<NaiveDate>,
    /// Retry counter carried over from a deleted failed attempt.
    pub retry_count: i32,
    /// Trigger source.
    pub triggered_by: String,
}

/// One remote service line created for an activity. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    /// Local id.
    pub id: LineItemId,
    /// Owning invoice.
    pub invoice_id: InvoiceId,
    /// Booking-source activity id.
    pub activity_id: i64,
    /// Remote service id.
    pub remote_service_id: String,
    /// Remote pricing-line id.
    pub remote_pricing_line_id: String,
    /// Remote payment movement id.
    pub remote_payment_id: String,
    /// Product title.
    pub product_title: String,
    /// Quantity.
    pub quantity: i32,
    /// Unit price.
    pub unit_price: Decimal,
    /// Total price.
    pub total_price: Decimal,
    /// Service date sent to the remote.
    pub service_date: Option<NaiveDate>,
    /// Participants.
    pub participant_count: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a line item.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    /// Owning invoice.
    pub invoice_id: InvoiceId,
    /// Activity id.
    pub activity_id: i64,
    /// Remote service id.
    pub remote_service_id: String,
    /// Remote pricing-line id.
    pub remote_pricing_line_id: String,
    /// Remote payment movement id.
    pub remote_payment_id: String,
    /// Product title.
    pub product_title: String,
    /// Quantity.
    pub quantity: i32,
    /// Unit price.
    pub unit_price: Decimal,
    /// Total price.
    pub total_price: Decimal,
    /// Service date.
    pub service_date: Option<NaiveDate>,
    /// Participants.
    pub participant_count: i32,
}

/// Entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    /// Local invoice.
    Invoice,
    /// Monthly pratica.
    MonthlyPratica,
}

impl AuditEntityType {
    /// Returns the string representation of the entity type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::MonthlyPratica => "monthly_pratica",
        }
    }

    /// Parses an entity type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "monthly_pratica" => Some(Self::MonthlyPratica),
            _ => None,
        }
    }
}

/// Append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Local id.
    pub id: AuditLogId,
    /// Entity kind.
    pub entity_type: AuditEntityType,
    /// Entity id; may refer to a deleted invoice.
    pub entity_id: uuid::Uuid,
    /// Action name.
    pub action: String,
    /// Status before the action.
    pub old_status: Option<String>,
    /// Status after the action.
    pub new_status: Option<String>,
    /// Free-form details.
    pub details: Value,
    /// Actor.
    pub actor: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Input for appending an audit entry.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Entity kind.
    pub entity_type: AuditEntityType,
    /// Entity id.
    pub entity_id: uuid::Uuid,
    /// Action name.
    pub action: &'static str,
    /// Status before the action.
    pub old_status: Option<String>,
    /// Status after the action.
    pub new_status: Option<String>,
    /// Free-form details.
    pub details: Value,
    /// Actor.
    pub actor: String,
}

/// Invoice list filter.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    /// Earliest creation date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest creation date, inclusive.
    pub to: Option<NaiveDate>,
    /// Status.
    pub status: Option<InvoiceStatus>,
    /// Seller name, case-insensitive exact match.
    pub seller: Option<String>,
    /// Confirmation code, exact match.
    pub confirmation_code: Option<String>,
    /// Page window.
    pub page: PageRequest,
}

/// Monthly pratica list filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PraticaFilter {
    /// Earliest period, inclusive.
    pub from: Option<YearMonth>,
    /// Latest period, inclusive.
    pub to: Option<YearMonth>,
    /// Status.
    pub status: Option<PraticaStatus>,
}

/// Result of `attach_booking`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachOutcome {
    /// Local invoice.
    pub invoice_id: InvoiceId,
    /// Monthly pratica the invoice belongs to.
    pub pratica_id: Option<MonthlyPraticaId>,
    /// Invoice status.
    pub status: InvoiceStatus,
    /// True when an existing invoice was returned without remote calls.
    pub already_attached: bool,
}

impl AttachOutcome {
    /// Outcome describing an invoice that already existed.
    #[must_use]
    pub fn existing(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.id,
            pratica_id: invoice.pratica_id,
            status: invoice.status,
            already_attached: true,
        }
    }
}

/// A booking the retry pass could not bring to `sent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryFailure {
    /// Booking id.
    pub booking_id: i64,
    /// Error message.
    pub error: String,
}

/// Result of a retry pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    /// Bookings now `sent`.
    pub success: Vec<i64>,
    /// Bookings still failing.
    pub failed: Vec<RetryFailure>,
}

/// Invoice with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceDetail {
    /// Invoice.
    #[serde(flatten)]
    pub invoice: Invoice,
    /// Line items in creation order.
    pub line_items: Vec<InvoiceLineItem>,
}
