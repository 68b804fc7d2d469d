//! Repository abstractions for data access.
//!
//! [`SeaOrmInvoicingStore`] implements every persistence trait the invoicing
//! core depends on; [`BookingRepository`] serves the booking mirror.

mod audit_log;
mod booking;
mod invoice;
mod invoice_rule;
mod pratica;
mod store;

pub use booking::BookingRepository;
pub use store::SeaOrmInvoicingStore;
