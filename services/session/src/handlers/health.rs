use axum::{extract::State, http::StatusCode};

use crate::domain::store::KvStore;
use crate::infra::db;
use crate::state::AppState;

/// Handler for `GET /readyz`: both the key-value store and the subject store answer.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    if let Err(e) = state.kv_store().ping().await {
        tracing::warn!(error = %e, "readiness: key-value store unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Err(e) = db::ping(&state.db).await {
        tracing::warn!(error = %e, "readiness: subject store unreachable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
