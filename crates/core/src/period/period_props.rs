//! Property-based tests for period resolution.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use proptest::prelude::*;
use pratica_shared::types::InvoiceRuleId;
use rust_decimal::Decimal;

use crate::booking::{Activity, Booking, Customer};
use crate::period::{DateBasis, InvoiceRule, resolve_period};

fn arb_datetime() -> impl Strategy<Value = DateTime<Utc>> {
    // 2000-01-01 .. 2037-12-31
    (946_684_800_i64..2_145_916_800_i64)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}

fn arb_seller() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,20}"
}

fn make_booking(created: DateTime<Utc>, seller: &str, starts: &[(DateTime<Utc>, bool)]) -> Booking {
    Booking {
        booking_id: 1,
        confirmation_code: "P".to_string(),
        created_at: created.to_rfc3339(),
        total_amount: Decimal::ONE,
        currency: None,
        customer: Customer {
            id: 1,
            first_name: String::new(),
            last_name: String::new(),
            email: None,
        },
        seller: Some(seller.to_string()),
        activities: starts
            .iter()
            .enumerate()
            .map(|(i, (start, cancelled))| Activity {
                id: i64::try_from(i).unwrap_or_default(),
                title: "t".to_string(),
                total_price: Decimal::ONE,
                start_time: Some(start.format("%Y-%m-%d %H:%M:%S").to_string()),
                participant_count: 1,
                seller: None,
                cancelled: *cancelled,
            })
            .collect(),
    }
}

fn make_rule(seller: &str, basis: DateBasis) -> InvoiceRule {
    InvoiceRule {
        id: InvoiceRuleId::new(),
        name: "r".to_string(),
        active: true,
        seller_names: vec![seller.to_string()],
        date_basis: basis,
        start_date: None,
        created_at: Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Without a matching rule the period is always the creation month.
    #[test]
    fn prop_no_rule_uses_creation_month(
        created in arb_datetime(),
        seller in arb_seller(),
        now in arb_datetime(),
    ) {
        let booking = make_booking(created, &seller, &[]);
        let resolved = resolve_period(&booking, &[], now);

        prop_assert_eq!(resolved.basis, DateBasis::Creation);
        prop_assert_eq!(resolved.year_month.year(), created.year());
        prop_assert_eq!(resolved.year_month.month(), created.month());
        prop_assert!(!resolved.fell_back);
    }

    /// Travel basis picks the month of the latest non-cancelled start.
    #[test]
    fn prop_travel_uses_latest_non_cancelled_start(
        created in arb_datetime(),
        seller in arb_seller(),
        starts in prop::collection::vec((arb_datetime(), any::<bool>()), 1..6),
        now in arb_datetime(),
    ) {
        let booking = make_booking(created, &seller, &starts);
        let rules = vec![make_rule(&seller, DateBasis::Travel)];
        let resolved = resolve_period(&booking, &rules, now);

        let expected = starts
            .iter()
            .filter(|(_, cancelled)| !cancelled)
            .map(|(start, _)| *start)
            .max()
            .unwrap_or(now);

        prop_assert_eq!(resolved.basis, DateBasis::Travel);
        prop_assert_eq!(resolved.year_month.year(), expected.year());
        prop_assert_eq!(resolved.year_month.month(), expected.month());
        prop_assert_eq!(resolved.fell_back, starts.iter().all(|(_, cancelled)| *cancelled));
    }

    /// Seller matching ignores case and surrounding whitespace.
    #[test]
    fn prop_rule_matching_is_case_insensitive(
        created in arb_datetime(),
        seller in arb_seller(),
        now in arb_datetime(),
    ) {
        let booking = make_booking(created, &seller, &[]);
        let rules = vec![make_rule(&format!("  {}  ", seller.to_uppercase()), DateBasis::Creation)];
        let resolved = resolve_period(&booking, &rules, now);

        prop_assert_eq!(resolved.rule_id, Some(rules[0].id));
    }
}
