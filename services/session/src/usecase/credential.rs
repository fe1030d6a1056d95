use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Algorithm;

use arcana_auth_types::token::{Claims, TokenKind, VerifiedToken, encode_claims, verify_token_at};
use arcana_domain::id::SubjectId;

use crate::error::SessionError;

/// Signing key and lifetimes shared by every credential the service mints.
#[derive(Clone)]
pub struct CredentialSettings {
    pub secret: Vec<u8>,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub kind: TokenKind,
    pub subject_id: SubjectId,
    pub expires_at: DateTime<Utc>,
    /// Seconds from issue time to expiry.
    pub expires_in: i64,
}

/// Mints and validates self-contained signed tokens. Holds no state beyond
/// its settings, so one instance is shared by every request.
pub struct CredentialIssuer {
    settings: CredentialSettings,
}

impl CredentialIssuer {
    pub fn new(settings: CredentialSettings) -> Self {
        Self { settings }
    }

    fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.settings.access_ttl,
            TokenKind::Refresh => self.settings.refresh_ttl,
        }
    }

    pub fn issue(
        &self,
        subject_id: SubjectId,
        kind: TokenKind,
    ) -> Result<IssuedCredential, SessionError> {
        self.issue_at(subject_id, kind, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject_id: SubjectId,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, SessionError> {
        let expires_at = now + self.lifetime(kind);
        let claims = Claims {
            sub: subject_id.to_string(),
            kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode_claims(&claims, &self.settings.secret, self.settings.algorithm)
            .map_err(|e| SessionError::Internal(anyhow::Error::new(e).context("sign credential")))?;

        tracing::debug!(%subject_id, ?kind, exp = claims.exp, "credential issued");
        Ok(IssuedCredential {
            token,
            kind,
            subject_id,
            expires_at,
            expires_in: claims.exp - claims.iat,
        })
    }

    pub fn validate(&self, token: &str) -> Result<VerifiedToken, SessionError> {
        self.validate_at(token, Utc::now())
    }

    /// Every failure is `InvalidCredential`; the cause is never reported.
    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedToken, SessionError> {
        let verified = verify_token_at(
            token,
            &self.settings.secret,
            self.settings.algorithm,
            now.timestamp(),
        )?;
        Ok(verified)
    }

    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedCredential, SessionError> {
        self.refresh_at(refresh_token, Utc::now())
    }

    /// Mint a new access token from a refresh token. The refresh token is
    /// left as is and stays usable until its own expiry.
    pub fn refresh_at(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, SessionError> {
        let verified = self.validate_at(refresh_token, now)?;
        if verified.kind != TokenKind::Refresh {
            return Err(SessionError::InvalidCredential);
        }
        self.issue_at(verified.subject_id, TokenKind::Access, now)
    }
}
