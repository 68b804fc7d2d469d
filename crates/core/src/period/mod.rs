//! Accounting period resolution.
//!
//! A booking lands in the period derived from either its creation date or its
//! latest travel date, depending on the invoice rule matching its seller.

mod resolver;
mod types;

#[cfg(test)]
mod period_props;

pub use resolver::{resolve_period, select_rule};
pub use types::{DateBasis, InvoiceRule, ResolvedPeriod};
