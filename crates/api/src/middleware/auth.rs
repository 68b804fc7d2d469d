//! Bearer API token middleware for the invoicing routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pratica_shared::AppError;

use crate::AppState;
use crate::error::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
}

/// Rejects requests whose bearer token does not match `server.api_token`.
///
/// Passes everything through when no token is configured.
pub async fn api_token_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_token.as_deref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token);

    match presented {
        Some(token) if token == expected => next.run(request).await,
        Some(_) => ApiError::from(AppError::Unauthorized("invalid API token".into())).into_response(),
        None => ApiError::from(AppError::Unauthorized(
            "Authorization header with Bearer token is required".into(),
        ))
        .into_response(),
    }
}
