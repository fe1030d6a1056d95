use std::sync::Arc;

use arcana_auth_types::token::TokenKind;
use arcana_domain::subject::{ContactIdentifier, Subject};

use crate::domain::repository::SubjectRepository;
use crate::domain::store::KvStore;
use crate::error::SessionError;
use crate::usecase::credential::{CredentialIssuer, IssuedCredential};
use crate::usecase::verification::{VerificationGate, random_digits};

/// Longest nickname accepted at registration.
pub const MAX_NICKNAME_LEN: usize = 100;

/// `user_<last four digits>` of the identifier, or four random digits when it has none.
pub fn nickname_for(identifier: &ContactIdentifier) -> String {
    let digits = identifier.trailing_digits(4);
    if digits.is_empty() {
        return format!("user_{}", random_digits(4));
    }
    format!("user_{digits}")
}

// ── LoginWithCode ────────────────────────────────────────────────────────────

/// Progress of a code login. `TokensIssued` is terminal; a failure is
/// reported together with the last stage reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    AwaitingCode,
    CodeVerified,
    SubjectResolved,
    TokensIssued,
}

impl LoginStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingCode => "awaiting_code",
            Self::CodeVerified => "code_verified",
            Self::SubjectResolved => "subject_resolved",
            Self::TokensIssued => "tokens_issued",
        }
    }
}

pub struct LoginWithCodeInput {
    pub identifier: ContactIdentifier,
    pub code: String,
}

#[derive(Debug)]
pub struct LoginWithCodeOutput {
    pub subject: Subject,
    pub access: IssuedCredential,
    pub refresh: IssuedCredential,
}

pub struct LoginWithCodeUseCase<S: KvStore, R: SubjectRepository> {
    pub gate: VerificationGate<S>,
    pub subjects: R,
    pub issuer: Arc<CredentialIssuer>,
}

impl<S: KvStore, R: SubjectRepository> LoginWithCodeUseCase<S, R> {
    pub async fn execute(
        &self,
        input: LoginWithCodeInput,
    ) -> Result<LoginWithCodeOutput, SessionError> {
        let mut stage = LoginStage::AwaitingCode;
        let result = self.run(&input, &mut stage).await;
        match &result {
            Ok(output) => tracing::info!(
                subject_id = %output.subject.id,
                identifier = %input.identifier.masked(),
                "login succeeded"
            ),
            Err(e) => tracing::info!(
                identifier = %input.identifier.masked(),
                stage = stage.as_str(),
                kind = e.kind(),
                "login failed"
            ),
        }
        result
    }

    async fn run(
        &self,
        input: &LoginWithCodeInput,
        stage: &mut LoginStage,
    ) -> Result<LoginWithCodeOutput, SessionError> {
        self.gate.verify_code(&input.identifier, &input.code).await?;
        *stage = LoginStage::CodeVerified;

        let subject = self.resolve_subject(&input.identifier).await?;
        *stage = LoginStage::SubjectResolved;

        if !subject.active {
            return Err(SessionError::InactiveSubject);
        }

        let access = self.issuer.issue(subject.id, TokenKind::Access)?;
        let refresh = self.issuer.issue(subject.id, TokenKind::Refresh)?;
        *stage = LoginStage::TokensIssued;

        Ok(LoginWithCodeOutput {
            subject,
            access,
            refresh,
        })
    }

    /// Existing subject for the identifier, or a new one on first login.
    async fn resolve_subject(
        &self,
        identifier: &ContactIdentifier,
    ) -> Result<Subject, SessionError> {
        if let Some(subject) = self.subjects.find_by_contact(identifier).await? {
            return Ok(subject);
        }

        let subject = Subject::new(identifier, Some(nickname_for(identifier)));
        match self.subjects.create(&subject).await {
            Ok(()) => {
                tracing::info!(subject_id = %subject.id, "subject created on first login");
                Ok(subject)
            }
            // A concurrent login for the same identifier won the insert.
            Err(SessionError::SubjectConflict) => self
                .subjects
                .find_by_contact(identifier)
                .await?
                .ok_or_else(|| anyhow::anyhow!("subject vanished after conflict").into()),
            Err(e) => Err(e),
        }
    }
}

// ── RefreshToken ─────────────────────────────────────────────────────────────

pub struct RefreshTokenUseCase<R: SubjectRepository> {
    pub subjects: R,
    pub issuer: Arc<CredentialIssuer>,
}

impl<R: SubjectRepository> RefreshTokenUseCase<R> {
    pub async fn execute(&self, refresh_token: &str) -> Result<IssuedCredential, SessionError> {
        let access = self.issuer.refresh(refresh_token)?;

        let subject = self
            .subjects
            .find_by_id(access.subject_id)
            .await?
            .ok_or(SessionError::InvalidCredential)?;
        if !subject.active {
            return Err(SessionError::InactiveSubject);
        }
        Ok(access)
    }
}

// ── RegisterSubject ──────────────────────────────────────────────────────────

pub struct RegisterSubjectInput {
    pub identifier: ContactIdentifier,
    pub nickname: Option<String>,
}

pub struct RegisterSubjectUseCase<R: SubjectRepository> {
    pub subjects: R,
}

impl<R: SubjectRepository> RegisterSubjectUseCase<R> {
    pub async fn execute(&self, input: RegisterSubjectInput) -> Result<Subject, SessionError> {
        let nickname = match input.nickname.as_deref().map(str::trim) {
            Some(n) if n.chars().count() > MAX_NICKNAME_LEN => {
                return Err(SessionError::InvalidIdentifier(
                    "nickname is too long".to_owned(),
                ));
            }
            Some(n) if !n.is_empty() => n.to_owned(),
            _ => nickname_for(&input.identifier),
        };

        if self
            .subjects
            .find_by_contact(&input.identifier)
            .await?
            .is_some()
        {
            return Err(SessionError::SubjectConflict);
        }

        let subject = Subject::new(&input.identifier, Some(nickname));
        self.subjects.create(&subject).await?;
        tracing::info!(
            subject_id = %subject.id,
            identifier = %input.identifier.masked(),
            "subject registered"
        );
        Ok(subject)
    }
}
