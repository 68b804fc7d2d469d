//! `SeaORM` entity definitions.
//!
//! Status columns are stored as short strings guarded by CHECK constraints
//! and converted to the core enums in the repositories.

pub mod bookings;
pub mod invoice_audit_log;
pub mod invoice_line_items;
pub mod invoice_rules;
pub mod invoices;
pub mod monthly_praticas;

pub mod prelude {
    //! Entity re-exports.

    pub use super::bookings::Entity as Bookings;
    pub use super::invoice_audit_log::Entity as InvoiceAuditLog;
    pub use super::invoice_line_items::Entity as InvoiceLineItems;
    pub use super::invoice_rules::Entity as InvoiceRules;
    pub use super::invoices::Entity as Invoices;
    pub use super::monthly_praticas::Entity as MonthlyPraticas;
}
