//! Period resolver.

use chrono::{DateTime, Utc};
use pratica_shared::types::YearMonth;
use tracing::warn;

use super::types::{DateBasis, InvoiceRule, ResolvedPeriod};
use crate::booking::Booking;

/// Picks the rule for a seller: first active, in-force, covering rule ordered
/// by `created_at` then id.
pub fn select_rule<'a>(
    seller: &str,
    rules: &'a [InvoiceRule],
    booking_created_at: Option<DateTime<Utc>>,
) -> Option<&'a InvoiceRule> {
    let mut candidates: Vec<&InvoiceRule> = rules
        .iter()
        .filter(|r| r.active && r.covers_seller(seller) && r.in_force_for(booking_created_at))
        .collect();
    candidates.sort_by_key(|r| (r.created_at, r.id));

    if candidates.len() > 1 {
        warn!(
            seller = %seller,
            matches = candidates.len(),
            chosen_rule = %candidates[0].id,
            "Multiple active invoice rules match seller, using the oldest"
        );
    }

    candidates.first().copied()
}

/// Resolves the accounting period for a booking.
///
/// Never fails: when the selected basis yields no parseable date the period of
/// `now` is used and `fell_back` is set.
pub fn resolve_period(booking: &Booking, rules: &[InvoiceRule], now: DateTime<Utc>) -> ResolvedPeriod {
    let created_at = booking.created_at_utc();
    let seller = booking.seller_name();
    let rule = seller.and_then(|s| select_rule(s, rules, created_at));
    let basis = rule.map_or(DateBasis::Creation, |r| r.date_basis);

    let basis_date = match basis {
        DateBasis::Creation => created_at,
        DateBasis::Travel => booking.latest_travel_time(),
    };

    // Dates past year 9999 parse but cannot key a period.
    let resolved = basis_date.and_then(YearMonth::from_datetime);
    let (year_month, fell_back) = if let Some(ym) = resolved {
        (ym, false)
    } else {
        warn!(
            booking_id = booking.booking_id,
            basis = %basis,
            created_at = %booking.created_at,
            "No usable date for period resolution, using processing date"
        );
        (YearMonth::from_datetime(now).unwrap_or(YearMonth::MAX), true)
    };

    ResolvedPeriod {
        year_month,
        basis,
        matched_seller: rule.and(seller).map(str::to_string),
        rule_id: rule.map(|r| r.id),
        fell_back,
    }
}
