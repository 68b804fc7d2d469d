//! Monthly pratica invoicing routes.
//!
//! Trigger surface (attach, retry, finalize) and read-only queries. Every
//! body, success or failure, is an [`ApiEnvelope`].

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use pratica_core::invoicing::{
    AttachOutcome, AuditLogEntry, Invoice, InvoiceDetail, InvoiceFilter, InvoiceStatus,
    MonthlyPratica, PraticaFilter, PraticaStatus, RetryReport,
};
use pratica_shared::types::{ApiEnvelope, InvoiceId, PageRequest, YearMonth};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

type ApiResult<T> = Result<Json<ApiEnvelope<T>>, ApiError>;

/// Creates the invoicing routes (API token middleware is applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoicing/bookings/{booking_id}/attach", post(attach_booking))
        .route("/invoicing/bookings/{booking_id}/invoices", get(invoices_for_booking))
        .route("/invoicing/retry", post(retry_failed))
        .route("/invoicing/invoices", get(list_invoices))
        .route("/invoicing/invoices/{invoice_id}", get(get_invoice))
        .route("/invoicing/invoices/{invoice_id}/audit-log", get(invoice_audit_log))
        .route("/invoicing/praticas", get(list_praticas))
        .route("/invoicing/praticas/{year_month}/finalize", post(finalize_period))
}

/// Request body for attaching a booking. The body may be empty.
#[derive(Debug, Default, Deserialize)]
pub struct AttachRequest {
    /// Who or what triggered the attach; defaults to `api`.
    pub triggered_by: Option<String>,
}

/// Request body for a retry pass. The body may be empty.
#[derive(Debug, Default, Deserialize)]
pub struct RetryRequest {
    /// Retry failed invoices whose retry count is below this.
    pub max_retries: Option<i32>,
}

/// Query parameters for the invoice list.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    /// Earliest creation date (YYYY-MM-DD), inclusive.
    pub from: Option<NaiveDate>,
    /// Latest creation date (YYYY-MM-DD), inclusive.
    pub to: Option<NaiveDate>,
    /// `pending`, `sent` or `failed`.
    pub status: Option<String>,
    /// Seller name, case-insensitive.
    pub seller: Option<String>,
    /// Exact confirmation code.
    pub confirmation_code: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl InvoiceListQuery {
    fn into_filter(self) -> Result<InvoiceFilter, ApiError> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                InvoiceStatus::parse(s)
                    .ok_or_else(|| ApiError::validation(format!("unknown invoice status: {s}")))
            })
            .transpose()?;
        let defaults = PageRequest::default();

        Ok(InvoiceFilter {
            from: self.from,
            to: self.to,
            status,
            seller: self.seller.filter(|s| !s.trim().is_empty()),
            confirmation_code: self.confirmation_code.filter(|c| !c.trim().is_empty()),
            page: PageRequest::new(
                self.page.unwrap_or(defaults.page),
                self.per_page.unwrap_or(defaults.per_page),
            ),
        })
    }
}

/// Query parameters for the monthly pratica list.
#[derive(Debug, Default, Deserialize)]
pub struct PraticaListQuery {
    /// Earliest period (YYYY-MM), inclusive.
    pub from: Option<String>,
    /// Latest period (YYYY-MM), inclusive.
    pub to: Option<String>,
    /// `open` or `finalized`.
    pub status: Option<String>,
}

impl PraticaListQuery {
    fn into_filter(self) -> Result<PraticaFilter, ApiError> {
        let status = self
            .status
            .as_deref()
            .map(|s| {
                PraticaStatus::parse(s)
                    .ok_or_else(|| ApiError::validation(format!("unknown pratica status: {s}")))
            })
            .transpose()?;

        Ok(PraticaFilter {
            from: self.from.as_deref().map(parse_year_month).transpose()?,
            to: self.to.as_deref().map(parse_year_month).transpose()?,
            status,
        })
    }
}

/// POST `/invoicing/bookings/{booking_id}/attach` - Attach a booking to its monthly pratica.
///
/// 201 when a new invoice was created, 200 when the booking was already attached.
async fn attach_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiEnvelope<AttachOutcome>>), ApiError> {
    let booking_id = parse_booking_id(&booking_id)?;
    let request: AttachRequest = parse_optional_body(&body)?;

    let outcome = state
        .invoicing
        .attach_booking(booking_id, request.triggered_by.as_deref())
        .await?;

    info!(
        booking_id,
        invoice_id = %outcome.invoice_id,
        status = %outcome.status,
        already_attached = outcome.already_attached,
        "Attach request handled"
    );

    let status = if outcome.already_attached {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(ApiEnvelope::ok(outcome))))
}

/// GET `/invoicing/bookings/{booking_id}/invoices` - Invoices recorded for a booking.
async fn invoices_for_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> ApiResult<Vec<Invoice>> {
    let booking_id = parse_booking_id(&booking_id)?;
    let invoices = state.invoicing.invoices_for_booking(booking_id).await?;
    Ok(Json(ApiEnvelope::list(invoices)))
}

/// POST `/invoicing/retry` - Re-drive failed invoices.
async fn retry_failed(State(state): State<AppState>, body: Bytes) -> ApiResult<RetryReport> {
    let request: RetryRequest = parse_optional_body(&body)?;
    let max_retries = request.max_retries.unwrap_or(state.default_max_retries);

    let report = state.invoicing.retry_failed(max_retries).await?;

    info!(
        max_retries,
        succeeded = report.success.len(),
        failed = report.failed.len(),
        "Retry pass handled"
    );
    Ok(Json(ApiEnvelope::ok(report)))
}

/// GET `/invoicing/invoices` - Filtered, paginated invoice list, newest first.
async fn list_invoices(
    State(state): State<AppState>,
    query: Result<Query<InvoiceListQuery>, QueryRejection>,
) -> ApiResult<Vec<Invoice>> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let invoices = state.invoicing.list_invoices(query.into_filter()?).await?;
    Ok(Json(ApiEnvelope::list(invoices)))
}

/// GET `/invoicing/invoices/{invoice_id}` - Invoice with its line items.
async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> ApiResult<InvoiceDetail> {
    let invoice_id = parse_invoice_id(&invoice_id)?;
    let detail = state.invoicing.invoice_detail(invoice_id).await?;
    Ok(Json(ApiEnvelope::ok(detail)))
}

/// GET `/invoicing/invoices/{invoice_id}/audit-log` - Audit entries of an invoice.
///
/// Entries outlive invoices deleted for retry, so an unknown id yields an empty list.
async fn invoice_audit_log(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> ApiResult<Vec<AuditLogEntry>> {
    let invoice_id = parse_invoice_id(&invoice_id)?;
    let entries = state.invoicing.invoice_audit_log(invoice_id).await?;
    Ok(Json(ApiEnvelope::list(entries)))
}

/// GET `/invoicing/praticas` - Monthly praticas, newest period first.
async fn list_praticas(
    State(state): State<AppState>,
    query: Result<Query<PraticaListQuery>, QueryRejection>,
) -> ApiResult<Vec<MonthlyPratica>> {
    let Query(query) = query.map_err(|e| ApiError::validation(e.body_text()))?;
    let praticas = state.invoicing.list_praticas(query.into_filter()?).await?;
    Ok(Json(ApiEnvelope::list(praticas)))
}

/// POST `/invoicing/praticas/{year_month}/finalize` - Close a period.
async fn finalize_period(
    State(state): State<AppState>,
    Path(year_month): Path<String>,
) -> ApiResult<MonthlyPratica> {
    let period = parse_year_month(&year_month)?;

    let pratica = state.invoicing.finalize_period(&period.to_string()).await?;

    info!(year_month = %period, pratica_id = %pratica.id, "Period finalized via API");
    Ok(Json(ApiEnvelope::ok(pratica)))
}

fn parse_booking_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::validation(format!("invalid booking id: {raw}")))
}

fn parse_invoice_id(raw: &str) -> Result<InvoiceId, ApiError> {
    raw.parse::<InvoiceId>()
        .map_err(|_| ApiError::validation(format!("invalid invoice id: {raw}")))
}

fn parse_year_month(raw: &str) -> Result<YearMonth, ApiError> {
    raw.parse::<YearMonth>()
        .map_err(|e| ApiError::validation(e.to_string()))
}

/// Empty bodies fall back to the request's defaults.
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("invalid JSON body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppState, Invoicing, create_router};
    use axum::{
        body::Body,
        http::{Request, header::AUTHORIZATION},
    };
    use http_body_util::BodyExt;
    use pratica_accounting::HttpAccountingClient;
    use pratica_db::entities::{invoice_audit_log, invoices, monthly_praticas};
    use pratica_db::{BookingRepository, SeaOrmInvoicingStore};
    use pratica_shared::AccountingProfile;
    use pratica_shared::config::AccountingConfig;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    const TOKEN: &str = "test-token";

    fn test_state(db: DatabaseConnection, api_token: Option<&str>) -> AppState {
        let client = HttpAccountingClient::new(&AccountingConfig {
            base_url: "http://127.0.0.1:9/api".to_string(),
            username: "sync".to_string(),
            password: "secret".to_string(),
            timeout_secs: 1,
            token_refresh_margin_secs: 60,
            lookup_cache_capacity: 16,
        })
        .unwrap();
        let db = Arc::new(db);
        let invoicing: Invoicing = Invoicing::new(
            Arc::new(SeaOrmInvoicingStore::new(Arc::clone(&db))),
            Arc::new(client),
            Arc::new(BookingRepository::new(db)),
            AccountingProfile::default(),
        );

        AppState {
            invoicing: Arc::new(invoicing),
            api_token: api_token.map(Arc::from),
            default_max_retries: 3,
        }
    }

    fn empty_db() -> DatabaseConnection {
        MockDatabase::new(DatabaseBackend::Postgres).into_connection()
    }

    fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(body)
            .unwrap()
    }

    async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn pratica_row() -> monthly_praticas::Model {
        let now = chrono::Utc::now();
        monthly_praticas::Model {
            id: uuid::Uuid::now_v7(),
            year_month: "2026-03".to_string(),
            remote_id: Some("PR-1".to_string()),
            display_number: None,
            period_code: Some("202603".to_string()),
            status: "open".to_string(),
            total_amount: dec!(60.00),
            booking_count: 3,
            metadata: json!({}),
            created_at: now.into(),
            updated_at: now.into(),
            finalized_at: None,
        }
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = create_router(test_state(empty_db(), Some(TOKEN)))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_returns_401_envelope() {
        let request = Request::builder()
            .uri("/api/v1/invoicing/praticas")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(test_state(empty_db(), Some(TOKEN)), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_token_returns_401() {
        let request = Request::builder()
            .uri("/api/v1/invoicing/praticas")
            .header(AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(test_state(empty_db(), Some(TOKEN)), request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_finalize_rejects_malformed_period_before_core() {
        for period in ["2026-13", "2026-1", "26-01", "2026-00"] {
            let (status, body) = send(
                test_state(empty_db(), Some(TOKEN)),
                request(
                    "POST",
                    &format!("/api/v1/invoicing/praticas/{period}/finalize"),
                    Body::empty(),
                ),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "period {period}");
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn test_list_praticas_returns_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![pratica_row()]])
            .into_connection();

        let (status, body) = send(
            test_state(db, Some(TOKEN)),
            request("GET", "/api/v1/invoicing/praticas?status=open", Body::empty()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["year_month"], "2026-03");
        assert_eq!(body["data"][0]["status"], "open");
    }

    #[tokio::test]
    async fn test_list_praticas_rejects_bad_range() {
        let (status, _) = send(
            test_state(empty_db(), None),
            request(
                "GET",
                "/api/v1/invoicing/praticas?from=2026-04&to=2026-01",
                Body::empty(),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_invoices_rejects_unknown_status() {
        let (status, body) = send(
            test_state(empty_db(), None),
            request("GET", "/api/v1/invoicing/invoices?status=archived", Body::empty()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("archived"));
    }

    #[tokio::test]
    async fn test_list_invoices_rejects_malformed_date() {
        let (status, body) = send(
            test_state(empty_db(), None),
            request("GET", "/api/v1/invoicing/invoices?from=yesterday", Body::empty()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_invoice_returns_404() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<invoices::Model>::new()])
            .into_connection();

        let (status, body) = send(
            test_state(db, None),
            request(
                "GET",
                &format!("/api/v1/invoicing/invoices/{}", InvoiceId::new()),
                Body::empty(),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_invoice_id_returns_400() {
        let (status, _) = send(
            test_state(empty_db(), None),
            request("GET", "/api/v1/invoicing/invoices/not-a-uuid", Body::empty()),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_audit_log_of_unknown_invoice_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<invoice_audit_log::Model>::new()])
            .into_connection();

        let (status, body) = send(
            test_state(db, None),
            request(
                "GET",
                &format!("/api/v1/invoicing/invoices/{}/audit-log", InvoiceId::new()),
                Body::empty(),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_retry_rejects_negative_max_retries() {
        let (status, body) = send(
            test_state(empty_db(), None),
            request(
                "POST",
                "/api/v1/invoicing/retry",
                Body::from(r#"{"max_retries":-1}"#),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_attach_rejects_bad_booking_id_and_body() {
        let (status, _) = send(
            test_state(empty_db(), None),
            request("POST", "/api/v1/invoicing/bookings/abc/attach", Body::empty()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            test_state(empty_db(), None),
            request("POST", "/api/v1/invoicing/bookings/42/attach", Body::from("{not json")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid JSON body"));
    }

    #[test]
    fn test_optional_body_defaults_when_empty() {
        let request: RetryRequest = parse_optional_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(request.max_retries.is_none());

        let request: AttachRequest =
            parse_optional_body(&Bytes::from_static(br#"{"triggered_by":"webhook"}"#)).unwrap();
        assert_eq!(request.triggered_by.as_deref(), Some("webhook"));
    }
}
