use arcana_auth_types::token::TokenKind;
use arcana_domain::subject::ContactIdentifier;
use arcana_session::error::SessionError;
use arcana_session::infra::memory::MemoryKvStore;
use arcana_session::usecase::session::{
    LoginWithCodeInput, LoginWithCodeUseCase, RefreshTokenUseCase, RegisterSubjectInput,
    RegisterSubjectUseCase,
};

use crate::helpers::{
    MockSubjectRepo, Outage, TEST_PHONE, phone, test_gate, test_issuer, test_subject,
};

fn login_usecase(
    store: &MemoryKvStore,
    subjects: &MockSubjectRepo,
) -> LoginWithCodeUseCase<MemoryKvStore, MockSubjectRepo> {
    LoginWithCodeUseCase {
        gate: test_gate(store),
        subjects: subjects.clone(),
        issuer: test_issuer(),
    }
}

// ── LoginWithCodeUseCase ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_log_in_new_phone_and_refresh_to_same_subject() {
    let store = MemoryKvStore::new();
    let subjects = MockSubjectRepo::empty();
    let login = login_usecase(&store, &subjects);

    let issued = login.gate.issue_code(&phone()).await.unwrap();
    assert_eq!(issued.code.len(), 6);
    assert!(issued.code.bytes().all(|b| b.is_ascii_digit()));

    let out = login
        .execute(LoginWithCodeInput {
            identifier: phone(),
            code: issued.code,
        })
        .await
        .unwrap();

    assert_eq!(subjects.count(), 1);
    assert_eq!(out.subject.phone.as_deref(), Some(TEST_PHONE));
    assert_eq!(out.subject.nickname.as_deref(), Some("user_4567"));
    assert!(out.subject.active);
    assert!(!out.access.token.is_empty());
    assert!(!out.refresh.token.is_empty());
    assert_eq!(out.access.kind, TokenKind::Access);
    assert_eq!(out.refresh.kind, TokenKind::Refresh);

    let refresh = RefreshTokenUseCase {
        subjects: subjects.clone(),
        issuer: test_issuer(),
    };
    let access = refresh.execute(&out.refresh.token).await.unwrap();
    assert!(!access.token.is_empty());

    let verified = test_issuer().validate(&access.token).unwrap();
    assert_eq!(verified.subject_id, out.subject.id);
    assert_eq!(verified.kind, TokenKind::Access);
}

#[tokio::test]
async fn should_reuse_existing_subject_matched_by_email() {
    let store = MemoryKvStore::new();
    let email = ContactIdentifier::parse("seer@example.com").unwrap();
    let existing = test_subject(&email);
    let subjects = MockSubjectRepo::new(vec![existing.clone()]);
    let login = login_usecase(&store, &subjects);

    let code = login.gate.issue_code(&email).await.unwrap().code;
    let out = login
        .execute(LoginWithCodeInput {
            identifier: email,
            code,
        })
        .await
        .unwrap();

    assert_eq!(out.subject.id, existing.id);
    assert_eq!(subjects.count(), 1);
}

#[tokio::test]
async fn should_fail_with_code_error_and_create_nothing() {
    let store = MemoryKvStore::new();
    let subjects = MockSubjectRepo::empty();
    let login = login_usecase(&store, &subjects);

    let result = login
        .execute(LoginWithCodeInput {
            identifier: phone(),
            code: "123456".to_owned(),
        })
        .await;

    assert!(
        matches!(result, Err(SessionError::CodeNotFound)),
        "expected CodeNotFound, got {result:?}"
    );
    assert_eq!(subjects.count(), 0);
}

#[tokio::test]
async fn should_reject_inactive_subject_after_consuming_code() {
    let store = MemoryKvStore::new();
    let existing = test_subject(&phone());
    let subjects = MockSubjectRepo::new(vec![existing.clone()]);
    subjects.deactivate(existing.id);
    let login = login_usecase(&store, &subjects);

    let code = login.gate.issue_code(&phone()).await.unwrap().code;
    let result = login
        .execute(LoginWithCodeInput {
            identifier: phone(),
            code: code.clone(),
        })
        .await;
    assert!(
        matches!(result, Err(SessionError::InactiveSubject)),
        "expected InactiveSubject, got {result:?}"
    );

    // The code was spent at the verification step.
    let result = login.gate.verify_code(&phone(), &code).await;
    assert!(matches!(result, Err(SessionError::CodeNotFound)));
}

#[tokio::test]
async fn should_propagate_subject_store_failure_without_tokens() {
    for outage in [Outage::Lookup, Outage::Insert] {
        let store = MemoryKvStore::new();
        let subjects = MockSubjectRepo::failing(outage);
        let login = login_usecase(&store, &subjects);

        let code = login.gate.issue_code(&phone()).await.unwrap().code;
        let result = login
            .execute(LoginWithCodeInput {
                identifier: phone(),
                code,
            })
            .await;

        assert!(
            matches!(result, Err(SessionError::SubjectStore(_))),
            "expected SubjectStore, got {result:?}"
        );
        assert_eq!(subjects.count(), 0);
    }
}

// ── RefreshTokenUseCase ──────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_refresh_for_deactivated_subject() {
    let existing = test_subject(&phone());
    let subjects = MockSubjectRepo::new(vec![existing.clone()]);
    let refresh_token = test_issuer()
        .issue(existing.id, TokenKind::Refresh)
        .unwrap()
        .token;
    subjects.deactivate(existing.id);

    let refresh = RefreshTokenUseCase {
        subjects,
        issuer: test_issuer(),
    };
    let result = refresh.execute(&refresh_token).await;
    assert!(matches!(result, Err(SessionError::InactiveSubject)));
}

#[tokio::test]
async fn should_reject_refresh_for_unknown_subject() {
    let stranger = test_subject(&phone());
    let refresh_token = test_issuer()
        .issue(stranger.id, TokenKind::Refresh)
        .unwrap()
        .token;

    let refresh = RefreshTokenUseCase {
        subjects: MockSubjectRepo::empty(),
        issuer: test_issuer(),
    };
    let result = refresh.execute(&refresh_token).await;
    assert!(matches!(result, Err(SessionError::InvalidCredential)));
}

// ── RegisterSubjectUseCase ───────────────────────────────────────────────────

#[tokio::test]
async fn should_register_subject_with_given_nickname() {
    let subjects = MockSubjectRepo::empty();
    let register = RegisterSubjectUseCase {
        subjects: subjects.clone(),
    };

    let subject = register
        .execute(RegisterSubjectInput {
            identifier: ContactIdentifier::parse("oracle@example.com").unwrap(),
            nickname: Some("  Oracle  ".to_owned()),
        })
        .await
        .unwrap();

    assert_eq!(subject.email.as_deref(), Some("oracle@example.com"));
    assert_eq!(subject.nickname.as_deref(), Some("Oracle"));
    assert!(subject.active);
    assert_eq!(subjects.count(), 1);
}

#[tokio::test]
async fn should_reject_registration_for_taken_identifier() {
    let subjects = MockSubjectRepo::new(vec![test_subject(&phone())]);
    let register = RegisterSubjectUseCase {
        subjects: subjects.clone(),
    };

    let result = register
        .execute(RegisterSubjectInput {
            identifier: phone(),
            nickname: None,
        })
        .await;
    assert!(matches!(result, Err(SessionError::SubjectConflict)));
    assert_eq!(subjects.count(), 1);
}

#[tokio::test]
async fn should_reject_overlong_nickname() {
    let register = RegisterSubjectUseCase {
        subjects: MockSubjectRepo::empty(),
    };
    let result = register
        .execute(RegisterSubjectInput {
            identifier: phone(),
            nickname: Some("x".repeat(101)),
        })
        .await;
    assert!(matches!(result, Err(SessionError::InvalidIdentifier(_))));
}
