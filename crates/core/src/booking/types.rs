//! Booking, customer and activity snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::timestamp::parse_timestamp;

/// Customer attached to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Booking-source customer id.
    pub id: i64,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
}

impl Customer {
    /// "First Last", trimmed.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// One bookable activity inside a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Booking-source activity id.
    pub id: i64,
    /// Product title.
    pub title: String,
    /// Total price of the activity.
    pub total_price: Decimal,
    /// Raw start time as received.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Number of participants.
    #[serde(default)]
    pub participant_count: i32,
    /// Seller of the activity.
    #[serde(default)]
    pub seller: Option<String>,
    /// Cancelled activities are never invoiced.
    #[serde(default)]
    pub cancelled: bool,
}

impl Activity {
    /// Parsed start time, if any.
    #[must_use]
    pub fn start_time_utc(&self) -> Option<DateTime<Utc>> {
        self.start_time.as_deref().and_then(parse_timestamp)
    }
}

/// Booking as mirrored from the booking source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Numeric booking id.
    pub booking_id: i64,
    /// Confirmation code shown to the customer.
    pub confirmation_code: String,
    /// Raw creation timestamp.
    pub created_at: String,
    /// Booking total.
    pub total_amount: Decimal,
    /// ISO currency code, when the source provides one.
    pub currency: Option<String>,
    /// Booking customer.
    pub customer: Customer,
    /// Explicit seller set on the booking.
    pub seller: Option<String>,
    /// Activities in booking order.
    pub activities: Vec<Activity>,
}

impl Booking {
    /// Parsed creation timestamp.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    /// Seller used for rule matching: the explicit seller, else the first
    /// activity carrying one. Blank names are ignored.
    #[must_use]
    pub fn seller_name(&self) -> Option<&str> {
        fn non_blank(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|name| !name.is_empty())
        }

        non_blank(self.seller.as_deref())
            .or_else(|| self.activities.iter().find_map(|a| non_blank(a.seller.as_deref())))
    }

    /// Latest parseable start time among non-cancelled activities.
    #[must_use]
    pub fn latest_travel_time(&self) -> Option<DateTime<Utc>> {
        self.activities
            .iter()
            .filter(|a| !a.cancelled)
            .filter_map(Activity::start_time_utc)
            .max()
    }

    /// Activities that will be invoiced, with their index in booking order.
    pub fn billable_activities(&self) -> impl Iterator<Item = (usize, &Activity)> {
        self.activities.iter().enumerate().filter(|(_, a)| !a.cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn activity(id: i64, start: Option<&str>, seller: Option<&str>, cancelled: bool) -> Activity {
        Activity {
            id,
            title: format!("Tour {id}"),
            total_price: dec!(10.00),
            start_time: start.map(str::to_string),
            participant_count: 2,
            seller: seller.map(str::to_string),
            cancelled,
        }
    }

    fn booking(seller: Option<&str>, activities: Vec<Activity>) -> Booking {
        Booking {
            booking_id: 1,
            confirmation_code: "ABC-1".to_string(),
            created_at: "2025-12-20T10:00:00Z".to_string(),
            total_amount: dec!(20.00),
            currency: Some("EUR".to_string()),
            customer: Customer {
                id: 7,
                first_name: " Ada ".to_string(),
                last_name: "Lovelace".to_string(),
                email: None,
            },
            seller: seller.map(str::to_string),
            activities,
        }
    }

    #[test]
    fn test_seller_prefers_explicit_value() {
        let b = booking(Some("Rome Walks"), vec![activity(1, None, Some("Other"), false)]);
        assert_eq!(b.seller_name(), Some("Rome Walks"));
    }

    #[test]
    fn test_seller_falls_back_to_first_activity_with_one() {
        let b = booking(
            Some("   "),
            vec![
                activity(1, None, None, false),
                activity(2, None, Some(" Venice Boats "), false),
            ],
        );
        assert_eq!(b.seller_name(), Some("Venice Boats"));
    }

    #[test]
    fn test_latest_travel_time_skips_cancelled_and_unparseable() {
        let b = booking(
            None,
            vec![
                activity(1, Some("2026-01-15"), None, false),
                activity(2, Some("2026-03-01"), None, true),
                activity(3, Some("soon"), None, false),
                activity(4, Some("2026-02-03 09:00:00"), None, false),
            ],
        );
        let latest = b.latest_travel_time().unwrap();
        assert_eq!(latest.to_rfc3339(), "2026-02-03T09:00:00+00:00");
    }

    #[test]
    fn test_billable_activities_keep_booking_index() {
        let b = booking(
            None,
            vec![
                activity(1, None, None, true),
                activity(2, None, None, false),
            ],
        );
        let indices: Vec<usize> = b.billable_activities().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1]);
    }

    #[test]
    fn test_customer_display_name() {
        let b = booking(None, vec![]);
        assert_eq!(b.customer.display_name(), "Ada Lovelace");
    }
}
