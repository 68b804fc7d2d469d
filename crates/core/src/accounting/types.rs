//! Request and response schemas of the remote accounting API.
//!
//! Field names follow the remote JSON (camelCase). Amounts travel as decimal
//! strings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Remote aggregate status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteAggregateStatus {
    /// Work in progress (local `open`).
    #[serde(rename = "WP")]
    WorkInProgress,
    /// Inserted (local `finalized`).
    #[serde(rename = "INS")]
    Inserted,
}

impl RemoteAggregateStatus {
    /// Wire code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkInProgress => "WP",
            Self::Inserted => "INS",
        }
    }
}

impl fmt::Display for RemoteAggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creation payload for a monthly aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAggregate {
    /// Owning agency.
    pub agency_code: String,
    /// Author.
    pub operator_code: String,
    /// Customer the aggregate is issued to.
    pub customer_code: String,
    /// Free-text description.
    pub description: String,
    /// Period code id from the registry.
    pub period_code_id: String,
    /// Initial status, always `WP`.
    pub status: RemoteAggregateStatus,
    /// Currency.
    pub currency: String,
    /// Opening date.
    pub opened_on: NaiveDate,
}

/// Remote aggregate record.
///
/// Fields not modelled here are kept in `extra` and written back unchanged on
/// full-record updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAggregate {
    /// Remote identifier.
    pub id: String,
    /// Human-facing number assigned by the back office.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_number: Option<String>,
    /// Current status.
    pub status: RemoteAggregateStatus,
    /// Everything else the remote returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Account creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    /// Lookup key, `BKC-<customer id>`.
    pub external_key: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Agency the account belongs to.
    pub agency_code: String,
}

/// Remote account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAccount {
    /// Remote identifier.
    pub id: String,
    /// Lookup key.
    pub external_key: String,
}

/// Passenger creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPassenger {
    /// Aggregate the passenger belongs to.
    pub pratica_id: String,
    /// Linked account, when the account step succeeded.
    pub account_id: Option<String>,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Booking correlation key.
    pub booking_reference: String,
}

/// Remote passenger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePassenger {
    /// Remote identifier.
    pub id: String,
}

/// Service line creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    /// Aggregate the service belongs to.
    pub pratica_id: String,
    /// Supplier code.
    pub supplier_code: String,
    /// Service type code.
    pub service_type_code: String,
    /// Product title.
    pub description: String,
    /// Service start date.
    pub start_date: NaiveDate,
    /// Service end date.
    pub end_date: NaiveDate,
    /// Participant count.
    pub quantity: i32,
    /// Booking correlation key.
    pub booking_reference: String,
}

/// Remote service line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteService {
    /// Remote identifier.
    pub id: String,
}

/// Pricing line creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPricingLine {
    /// Aggregate the line belongs to.
    pub pratica_id: String,
    /// Service being priced.
    pub service_id: String,
    /// Line description.
    pub description: String,
    /// Quantity.
    pub quantity: i32,
    /// Unit cost.
    pub unit_cost: Decimal,
    /// Unit revenue.
    pub unit_revenue: Decimal,
    /// Total cost.
    pub total_cost: Decimal,
    /// Total revenue.
    pub total_revenue: Decimal,
    /// Currency.
    pub currency: String,
}

/// Remote pricing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePricingLine {
    /// Remote identifier.
    pub id: String,
}

/// Payment movement creation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentMovement {
    /// Aggregate the movement belongs to.
    pub pratica_id: String,
    /// Payment type code.
    pub payment_type_code: String,
    /// Amount received.
    pub amount: Decimal,
    /// Currency.
    pub currency: String,
    /// Booking correlation key.
    pub reference: String,
    /// File code, same value as `reference`.
    pub file_code: String,
    /// Operator recording the movement.
    pub operator_code: String,
    /// Movement date.
    pub movement_date: NaiveDate,
}

/// Remote payment movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePaymentMovement {
    /// Remote identifier.
    pub id: String,
}

/// Period code registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePeriodCode {
    /// Remote identifier.
    pub id: String,
    /// Code, `YYYYMM`.
    pub code: String,
}
