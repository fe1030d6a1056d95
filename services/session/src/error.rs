use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};

use arcana_auth_types::token::InvalidCredential;
use arcana_domain::subject::IdentifierError;

use crate::domain::store::StoreError;

/// Session service error variants.
///
/// `CodeNotFound` and `CodeMismatch` stay distinct for callers inside the
/// crate but render identically on the wire, so a client cannot probe which
/// identifiers have an outstanding code.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("invalid or expired code")]
    CodeNotFound,
    #[error("invalid or expired code")]
    CodeMismatch,
    #[error("quota exhausted")]
    QuotaExhausted { reset_at: Option<DateTime<Utc>> },
    #[error("store unavailable, retry later")]
    StoreUnavailable,
    #[error("subject is inactive")]
    InactiveSubject,
    #[error("{0}")]
    InvalidIdentifier(String),
    #[error("subject already registered")]
    SubjectConflict,
    #[error("subject store error")]
    SubjectStore(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl SessionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::CodeNotFound | Self::CodeMismatch => "INVALID_CODE",
            Self::QuotaExhausted { .. } => "QUOTA_EXHAUSTED",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::InactiveSubject => "INACTIVE_SUBJECT",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::SubjectConflict => "SUBJECT_CONFLICT",
            Self::SubjectStore(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Whether the caller should retry the same request after a backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable)
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            tracing::warn!(error = %err, "key-value store unavailable");
            Self::StoreUnavailable
        } else {
            Self::Internal(anyhow::Error::new(err))
        }
    }
}

impl From<IdentifierError> for SessionError {
    fn from(err: IdentifierError) -> Self {
        Self::InvalidIdentifier(err.to_string())
    }
}

impl From<InvalidCredential> for SessionError {
    fn from(_: InvalidCredential) -> Self {
        Self::InvalidCredential
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidCredential | Self::CodeNotFound | Self::CodeMismatch => {
                StatusCode::UNAUTHORIZED
            }
            Self::QuotaExhausted { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InactiveSubject => StatusCode::FORBIDDEN,
            Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::SubjectConflict => StatusCode::CONFLICT,
            Self::SubjectStore(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // 4xx are expected client errors and already recorded by the trace layer.
        match &self {
            Self::SubjectStore(e) | Self::Internal(e) => {
                tracing::error!(error = ?e, kind = self.kind(), "internal error");
            }
            _ => {}
        }

        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::QuotaExhausted { reset_at } = &self {
            body["remaining"] = 0.into();
            body["reset_at"] = reset_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true).into())
                .unwrap_or(serde_json::Value::Null);
        }

        let mut response = (status, axum::Json(body)).into_response();
        if self.is_retryable() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}
