use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use arcana_domain::subject::ContactIdentifier;

use crate::error::SessionError;
use crate::state::AppState;

// ── POST /auth/code ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueCodeRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Serialize)]
pub struct IssueCodeResponse {
    pub code: String,
    pub ttl_seconds: u64,
}

/// The code is returned in the body; delivering it over email or SMS is a
/// separate channel's job.
pub async fn issue_code(
    State(state): State<AppState>,
    Json(body): Json<IssueCodeRequest>,
) -> Result<(StatusCode, Json<IssueCodeResponse>), SessionError> {
    let identifier = ContactIdentifier::from_parts(body.email.as_deref(), body.phone.as_deref())?;
    let issued = state.verification_gate().issue_code(&identifier).await?;
    Ok((
        StatusCode::CREATED,
        Json(IssueCodeResponse {
            code: issued.code,
            ttl_seconds: issued.ttl_seconds,
        }),
    ))
}

// ── POST /auth/code/verify ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyCodeResponse {
    pub verified: bool,
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, SessionError> {
    let identifier = ContactIdentifier::from_parts(body.email.as_deref(), body.phone.as_deref())?;
    state
        .verification_gate()
        .verify_code(&identifier, &body.code)
        .await?;
    Ok(Json(VerifyCodeResponse { verified: true }))
}
