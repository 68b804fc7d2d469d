//! Core business logic for the monthly pratica invoicing orchestrator.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence, the remote back office and the booking mirror are reached
//! through traits implemented by the outer crates.
//!
//! # Modules
//!
//! - `booking` - Booking snapshot read from the booking source
//! - `period` - Accounting period resolution from invoice rules
//! - `accounting` - Remote accounting capability and its wire schemas
//! - `invoicing` - Monthly aggregates, attachment, retry and finalization

pub mod accounting;
pub mod booking;
pub mod invoicing;
pub mod period;
