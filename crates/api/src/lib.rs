//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The inbound trigger surface (attach, retry, finalize)
//! - Query routes over invoices, praticas and the audit log
//! - Bearer API token middleware
//! - Envelope error responses

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use pratica_accounting::HttpAccountingClient;
use pratica_core::invoicing::InvoicingService;
use pratica_db::{BookingRepository, SeaOrmInvoicingStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Invoicing service over the production store, client and booking mirror.
pub type Invoicing = InvoicingService<SeaOrmInvoicingStore, HttpAccountingClient, BookingRepository>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Invoicing service facade.
    pub invoicing: Arc<Invoicing>,
    /// Bearer token required on invoicing routes; `None` disables the check.
    pub api_token: Option<Arc<str>>,
    /// Retry ceiling used when a retry request does not name one.
    pub default_max_retries: i32,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
