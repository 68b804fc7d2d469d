//! Booking snapshot as read from the booking source.
//!
//! The booking source (webhook ingestion, mirrored into the local datastore)
//! is read-only from the point of view of invoicing.

mod timestamp;
mod types;

pub use timestamp::parse_timestamp;
pub use types::{Activity, Booking, Customer};

use crate::invoicing::RepositoryError;

/// Width of the correlation key sent to the remote system.
pub const CORRELATION_KEY_WIDTH: usize = 9;

/// Prefix of the external key used to look up remote accounts.
pub const ACCOUNT_KEY_PREFIX: &str = "BKC-";

/// Read access to mirrored bookings.
///
/// Implemented by the db crate over the `bookings` mirror table.
pub trait BookingSource: Send + Sync {
    /// Find a booking by its numeric id.
    fn find_booking(
        &self,
        booking_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<Booking>, RepositoryError>> + Send;
}

/// Booking id left-padded with zeros to nine characters.
///
/// Used as the payment reference and file code on the remote side.
#[must_use]
pub fn correlation_key(booking_id: i64) -> String {
    format!("{booking_id:0width$}", width = CORRELATION_KEY_WIDTH)
}

/// External key identifying a customer's remote account.
#[must_use]
pub fn account_external_key(customer_id: i64) -> String {
    format!("{ACCOUNT_KEY_PREFIX}{customer_id}")
}
