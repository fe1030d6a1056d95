use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;

use arcana_auth_types::token::{TokenKind, validate_access_token};
use arcana_domain::id::SubjectId;
use arcana_session::error::SessionError;
use arcana_session::usecase::credential::{CredentialIssuer, CredentialSettings};

use crate::helpers::{TEST_JWT_SECRET, test_issuer, test_settings};

// ── issue / validate ─────────────────────────────────────────────────────────

#[test]
fn should_validate_issued_token_back_to_subject_and_kind() {
    let issuer = test_issuer();
    let id = SubjectId::generate();

    for kind in [TokenKind::Access, TokenKind::Refresh] {
        let issued = issuer.issue(id, kind).unwrap();
        assert!(!issued.token.is_empty());

        let verified = issuer.validate(&issued.token).unwrap();
        assert_eq!(verified.subject_id, id);
        assert_eq!(verified.kind, kind);
        assert_eq!(verified.expires_at, issued.expires_at.timestamp());
    }
}

#[test]
fn should_reject_token_issued_with_negative_lifetime() {
    let issuer = CredentialIssuer::new(CredentialSettings {
        access_ttl: Duration::seconds(-1),
        ..test_settings()
    });
    let issued = issuer
        .issue(SubjectId::generate(), TokenKind::Access)
        .unwrap();

    let result = issuer.validate(&issued.token);
    assert!(
        matches!(result, Err(SessionError::InvalidCredential)),
        "expected InvalidCredential, got {result:?}"
    );
}

#[test]
fn should_reject_tampered_token() {
    let issuer = test_issuer();
    let mut token = issuer
        .issue(SubjectId::generate(), TokenKind::Access)
        .unwrap()
        .token;
    let last = token.pop().unwrap();
    token.push(if last == 'A' { 'B' } else { 'A' });

    assert!(matches!(
        issuer.validate(&token),
        Err(SessionError::InvalidCredential)
    ));
}

#[test]
fn should_reject_token_signed_with_other_algorithm() {
    let hs512 = CredentialIssuer::new(CredentialSettings {
        algorithm: Algorithm::HS512,
        ..test_settings()
    });
    let token = hs512
        .issue(SubjectId::generate(), TokenKind::Access)
        .unwrap()
        .token;

    assert!(matches!(
        test_issuer().validate(&token),
        Err(SessionError::InvalidCredential)
    ));
}

#[test]
fn should_let_downstream_validate_access_tokens_only() {
    let issuer = test_issuer();
    let id = SubjectId::generate();
    let access = issuer.issue(id, TokenKind::Access).unwrap();
    let refresh = issuer.issue(id, TokenKind::Refresh).unwrap();

    let verified =
        validate_access_token(&access.token, TEST_JWT_SECRET, Algorithm::HS256).unwrap();
    assert_eq!(verified.subject_id, id);
    assert!(validate_access_token(&refresh.token, TEST_JWT_SECRET, Algorithm::HS256).is_err());
}

// ── refresh ──────────────────────────────────────────────────────────────────

#[test]
fn should_refresh_into_new_access_token_for_same_subject() {
    let issuer = test_issuer();
    let id = SubjectId::generate();
    let refresh = issuer.issue(id, TokenKind::Refresh).unwrap();

    let access = issuer.refresh(&refresh.token).unwrap();
    assert_eq!(access.kind, TokenKind::Access);
    assert_eq!(access.expires_in, 15 * 60);

    let verified = issuer.validate(&access.token).unwrap();
    assert_eq!(verified.subject_id, id);
    assert_eq!(verified.kind, TokenKind::Access);

    // No rotation: the same refresh token keeps working.
    assert!(issuer.refresh(&refresh.token).is_ok());
}

#[test]
fn should_reject_refresh_with_access_token() {
    let issuer = test_issuer();
    let access = issuer
        .issue(SubjectId::generate(), TokenKind::Access)
        .unwrap();

    assert!(matches!(
        issuer.refresh(&access.token),
        Err(SessionError::InvalidCredential)
    ));
}

#[test]
fn should_reject_refresh_token_after_expiry() {
    let issuer = test_issuer();
    let now = Utc::now();
    let refresh = issuer
        .issue_at(SubjectId::generate(), TokenKind::Refresh, now)
        .unwrap();

    let later = now + Duration::days(7);
    assert!(matches!(
        issuer.refresh_at(&refresh.token, later),
        Err(SessionError::InvalidCredential)
    ));
}

#[test]
fn should_validate_and_refresh_at_a_past_instant() {
    let issuer = test_issuer();
    let id = SubjectId::generate();
    let t0 = Utc::now() - Duration::hours(2);
    let access = issuer.issue_at(id, TokenKind::Access, t0).unwrap();
    let refresh = issuer.issue_at(id, TokenKind::Refresh, t0).unwrap();

    let one_minute_on = t0 + Duration::minutes(1);
    let verified = issuer.validate_at(&access.token, one_minute_on).unwrap();
    assert_eq!(verified.subject_id, id);
    assert!(issuer.refresh_at(&refresh.token, one_minute_on).is_ok());

    // Two hours on, the access token is long gone but the refresh token is not.
    assert!(matches!(
        issuer.validate(&access.token),
        Err(SessionError::InvalidCredential)
    ));
    assert!(issuer.refresh(&refresh.token).is_ok());
}
