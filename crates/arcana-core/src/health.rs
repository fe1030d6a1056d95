use axum::http::StatusCode;

/// Handler for `GET /healthz`: liveness check.
///
/// Readiness depends on each service's backing stores, so services define their own `readyz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
