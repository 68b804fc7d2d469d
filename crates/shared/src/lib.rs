//! Shared types, errors, and configuration for the pratica invoicing service.
//!
//! This crate provides common types used across all other crates:
//! - Two-decimal amount rounding
//! - Typed IDs for type-safe entity references
//! - Accounting periods (`YearMonth`)
//! - Pagination and the uniform response envelope
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AccountingProfile, AppConfig};
pub use error::{AppError, AppResult};
