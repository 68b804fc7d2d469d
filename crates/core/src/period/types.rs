//! Invoice rule and resolution result types.

use chrono::{DateTime, NaiveDate, Utc};
use pratica_shared::types::{InvoiceRuleId, YearMonth};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which booking timestamp decides the accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBasis {
    /// Booking creation date.
    Creation,
    /// Latest start time among non-cancelled activities.
    Travel,
}

impl DateBasis {
    /// Returns the string representation of the basis.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Travel => "travel",
        }
    }

    /// Parses a basis from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "creation" => Some(Self::Creation),
            "travel" => Some(Self::Travel),
            _ => None,
        }
    }
}

impl fmt::Display for DateBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Seller-scoped rule choosing the date basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRule {
    /// Rule id.
    pub id: InvoiceRuleId,
    /// Human-readable name.
    pub name: String,
    /// Inactive rules are ignored.
    pub active: bool,
    /// Seller names the rule applies to.
    pub seller_names: Vec<String>,
    /// Date basis applied to matching bookings.
    pub date_basis: DateBasis,
    /// Bookings created before this date are not covered.
    pub start_date: Option<NaiveDate>,
    /// Creation time, used to order overlapping rules.
    pub created_at: DateTime<Utc>,
}

impl InvoiceRule {
    /// Case-insensitive match on trimmed seller names.
    #[must_use]
    pub fn covers_seller(&self, seller: &str) -> bool {
        let wanted = seller.trim().to_lowercase();
        self.seller_names
            .iter()
            .any(|name| name.trim().to_lowercase() == wanted)
    }

    /// Whether the rule is in force for a booking created at `created_at`.
    ///
    /// An unknown creation date passes the gate.
    #[must_use]
    pub fn in_force_for(&self, created_at: Option<DateTime<Utc>>) -> bool {
        match (self.start_date, created_at) {
            (Some(start), Some(created)) => created.date_naive() >= start,
            _ => true,
        }
    }
}

/// Outcome of period resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPeriod {
    /// Accounting period.
    pub year_month: YearMonth,
    /// Basis actually applied.
    pub basis: DateBasis,
    /// Seller that matched a rule.
    pub matched_seller: Option<String>,
    /// Rule that matched.
    pub rule_id: Option<InvoiceRuleId>,
    /// True when no usable date was found and the processing date was used.
    pub fell_back: bool,
}
