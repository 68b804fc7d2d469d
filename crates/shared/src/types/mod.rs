//! Common types used across the application.

pub mod envelope;
pub mod id;
pub mod money;
pub mod pagination;
pub mod year_month;

pub use envelope::ApiEnvelope;
pub use id::*;
pub use money::{AMOUNT_SCALE, round_amount};
pub use pagination::PageRequest;
pub use year_month::{YearMonth, YearMonthError};
