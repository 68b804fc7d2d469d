//! HTTP realisation of the remote accounting capability.
//!
//! [`HttpAccountingClient`] implements [`pratica_core::accounting::AccountingApi`]
//! over JSON/HTTPS with a cached bearer token and cached idempotent lookups.

mod client;
mod session;
mod transport;

pub use client::HttpAccountingClient;
