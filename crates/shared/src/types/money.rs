//! Monetary amount rounding.
//!
//! CRITICAL: Never use floating-point for money calculations.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits every stored or transmitted amount carries.
pub const AMOUNT_SCALE: u32 = 2;

/// Rounds an amount to two fractional digits, halves away from zero.
#[must_use]
pub fn round_amount(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(AMOUNT_SCALE);
    rounded
}
