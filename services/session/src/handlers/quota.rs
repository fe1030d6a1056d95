use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use arcana_auth_types::identity::BearerToken;
use arcana_auth_types::token::TokenKind;

use crate::domain::types::{QuotaKind, QuotaScope};
use crate::error::SessionError;
use crate::state::AppState;
use crate::usecase::credential::CredentialIssuer;
use crate::usecase::quota::generate_device_fingerprint;

pub const X_DEVICE_FINGERPRINT: &str = "x-device-fingerprint";

#[derive(Deserialize)]
pub struct ScopeQuery {
    pub device_fingerprint: Option<String>,
}

/// Pick the quota scope for a request.
///
/// A bearer token selects the subject's scope and must be a valid access
/// token; a broken one is rejected rather than treated as anonymous.
/// Without a bearer the device fingerprint comes from the query string,
/// then the `x-device-fingerprint` header.
pub fn resolve_scope(
    issuer: &CredentialIssuer,
    bearer: Result<BearerToken, StatusCode>,
    query: &ScopeQuery,
    headers: &HeaderMap,
) -> Result<QuotaScope, SessionError> {
    let bearer = bearer.map_err(|_| SessionError::InvalidCredential)?;
    if let Some(token) = bearer.as_deref() {
        let verified = issuer.validate(token)?;
        if verified.kind != TokenKind::Access {
            return Err(SessionError::InvalidCredential);
        }
        return Ok(QuotaScope::User(verified.subject_id));
    }

    let fingerprint = query
        .device_fingerprint
        .as_deref()
        .or_else(|| {
            headers
                .get(X_DEVICE_FINGERPRINT)
                .and_then(|v| v.to_str().ok())
        })
        .ok_or_else(|| {
            SessionError::InvalidIdentifier("device fingerprint is required".to_owned())
        })?;
    QuotaScope::anonymous(fingerprint)
}

// ── GET /quota ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct QuotaResponse {
    #[serde(rename = "type")]
    pub kind: QuotaKind,
    pub remaining: u32,
    pub total: u32,
    #[serde(serialize_with = "arcana_core::serde::to_rfc3339_ms_opt")]
    pub reset_at: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn get_quota(
    State(state): State<AppState>,
    bearer: Result<BearerToken, StatusCode>,
    Query(query): Query<ScopeQuery>,
    headers: HeaderMap,
) -> Result<Json<QuotaResponse>, SessionError> {
    let scope = resolve_scope(&state.issuer, bearer, &query, &headers)?;
    let record = state.quota_ledger().get_quota(&scope).await?;
    Ok(Json(QuotaResponse {
        kind: record.kind,
        remaining: record.remaining,
        total: record.total,
        reset_at: record.reset_at,
    }))
}

// ── POST /quota/decrement ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct DecrementResponse {
    pub remaining: u32,
}

pub async fn decrement_quota(
    State(state): State<AppState>,
    bearer: Result<BearerToken, StatusCode>,
    Query(query): Query<ScopeQuery>,
    headers: HeaderMap,
) -> Result<Json<DecrementResponse>, SessionError> {
    let scope = resolve_scope(&state.issuer, bearer, &query, &headers)?;
    let remaining = state.quota_ledger().decrement(&scope).await?;
    Ok(Json(DecrementResponse { remaining }))
}

// ── POST /quota/fingerprint ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct FingerprintResponse {
    pub device_fingerprint: String,
}

pub async fn create_fingerprint() -> (StatusCode, Json<FingerprintResponse>) {
    (
        StatusCode::CREATED,
        Json(FingerprintResponse {
            device_fingerprint: generate_device_fingerprint(),
        }),
    )
}
