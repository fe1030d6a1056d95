use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use arcana_domain::subject::{ContactIdentifier, Subject};

use crate::error::SessionError;
use crate::state::AppState;
use crate::usecase::session::{
    LoginWithCodeInput, LoginWithCodeUseCase, RefreshTokenUseCase, RegisterSubjectInput,
    RegisterSubjectUseCase,
};

#[derive(Serialize)]
pub struct SubjectResponse {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nickname: Option<String>,
    #[serde(serialize_with = "arcana_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Subject> for SubjectResponse {
    fn from(s: Subject) -> Self {
        Self {
            id: s.id.to_string(),
            email: s.email,
            phone: s.phone,
            nickname: s.nickname,
            created_at: s.created_at,
        }
    }
}

// ── POST /auth/token ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTokenRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub code: String,
}

#[derive(Serialize)]
pub struct CreateTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub subject: SubjectResponse,
}

pub async fn create_token(
    State(state): State<AppState>,
    Json(body): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<CreateTokenResponse>), SessionError> {
    let identifier = ContactIdentifier::from_parts(body.email.as_deref(), body.phone.as_deref())?;
    let usecase = LoginWithCodeUseCase {
        gate: state.verification_gate(),
        subjects: state.subject_repo(),
        issuer: state.issuer.clone(),
    };
    let out = usecase
        .execute(LoginWithCodeInput {
            identifier,
            code: body.code,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            access_token: out.access.token,
            refresh_token: out.refresh.token,
            expires_in: out.access.expires_in,
            subject: out.subject.into(),
        }),
    ))
}

// ── PATCH /auth/token ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<(StatusCode, Json<RefreshTokenResponse>), SessionError> {
    let usecase = RefreshTokenUseCase {
        subjects: state.subject_repo(),
        issuer: state.issuer.clone(),
    };
    let access = usecase.execute(&body.refresh_token).await?;

    Ok((
        StatusCode::CREATED,
        Json(RefreshTokenResponse {
            access_token: access.token,
            expires_in: access.expires_in,
        }),
    ))
}

// ── POST /auth/register ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nickname: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub subject: SubjectResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), SessionError> {
    let identifier = ContactIdentifier::from_parts(body.email.as_deref(), body.phone.as_deref())?;
    let usecase = RegisterSubjectUseCase {
        subjects: state.subject_repo(),
    };
    let subject = usecase
        .execute(RegisterSubjectInput {
            identifier,
            nickname: body.nickname,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            subject: subject.into(),
        }),
    ))
}
