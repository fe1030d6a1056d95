use axum::{
    Router,
    routing::{get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use arcana_core::health::healthz;
use arcana_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    health::readyz,
    quota::{create_fingerprint, decrement_quota, get_quota},
    token::{create_token, refresh_token, register},
    verification::{issue_code, verify_code},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Verification code
        .route("/auth/code", post(issue_code))
        .route("/auth/code/verify", post(verify_code))
        // Token
        .route("/auth/token", post(create_token).patch(refresh_token))
        .route("/auth/register", post(register))
        // Quota
        .route("/quota", get(get_quota))
        .route("/quota/decrement", post(decrement_quota))
        .route("/quota/fingerprint", post(create_fingerprint))
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
