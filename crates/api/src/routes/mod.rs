//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::api_token_middleware};

pub mod health;
pub mod invoicing;

/// Creates the API router; invoicing routes sit behind the API token check.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(invoicing::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_token_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
