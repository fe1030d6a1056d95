use std::sync::{Arc, Mutex};
use std::time::Duration;

use jsonwebtoken::Algorithm;

use arcana_domain::id::SubjectId;
use arcana_domain::subject::{ContactIdentifier, Subject};
use arcana_session::domain::repository::SubjectRepository;
use arcana_session::domain::types::QuotaPolicy;
use arcana_session::error::SessionError;
use arcana_session::infra::memory::MemoryKvStore;
use arcana_session::usecase::credential::{CredentialIssuer, CredentialSettings};
use arcana_session::usecase::quota::QuotaLedger;
use arcana_session::usecase::verification::VerificationGate;

pub const TEST_JWT_SECRET: &[u8] = b"integration-test-secret";
pub const TEST_PHONE: &str = "+15551234567";

// ── MockSubjectRepo ──────────────────────────────────────────────────────────

/// Which repository call fails with a store error, if any.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub enum Outage {
    #[default]
    None,
    Lookup,
    Insert,
}

#[derive(Clone, Default)]
pub struct MockSubjectRepo {
    pub subjects: Arc<Mutex<Vec<Subject>>>,
    pub outage: Outage,
}

impl MockSubjectRepo {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self {
            subjects: Arc::new(Mutex::new(subjects)),
            outage: Outage::None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failing(outage: Outage) -> Self {
        Self {
            outage,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.subjects.lock().unwrap().len()
    }

    pub fn deactivate(&self, id: SubjectId) {
        let mut subjects = self.subjects.lock().unwrap();
        if let Some(s) = subjects.iter_mut().find(|s| s.id == id) {
            s.active = false;
        }
    }
}

fn store_down() -> SessionError {
    SessionError::SubjectStore(anyhow::anyhow!("connection refused"))
}

fn reachable_by(subject: &Subject, value: &str) -> bool {
    subject.email.as_deref() == Some(value) || subject.phone.as_deref() == Some(value)
}

impl SubjectRepository for MockSubjectRepo {
    async fn find_by_contact(
        &self,
        contact: &ContactIdentifier,
    ) -> Result<Option<Subject>, SessionError> {
        if self.outage == Outage::Lookup {
            return Err(store_down());
        }
        let subjects = self.subjects.lock().unwrap();
        Ok(subjects
            .iter()
            .find(|s| reachable_by(s, contact.as_str()))
            .cloned())
    }

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, SessionError> {
        let subjects = self.subjects.lock().unwrap();
        Ok(subjects.iter().find(|s| s.id == id).cloned())
    }

    async fn create(&self, subject: &Subject) -> Result<(), SessionError> {
        if self.outage == Outage::Insert {
            return Err(store_down());
        }
        let mut subjects = self.subjects.lock().unwrap();
        let taken = subjects.iter().any(|s| {
            subject.email.as_deref().is_some_and(|e| reachable_by(s, e))
                || subject.phone.as_deref().is_some_and(|p| reachable_by(s, p))
        });
        if taken {
            return Err(SessionError::SubjectConflict);
        }
        subjects.push(subject.clone());
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_settings() -> CredentialSettings {
    CredentialSettings {
        secret: TEST_JWT_SECRET.to_vec(),
        algorithm: Algorithm::HS256,
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(7),
    }
}

pub fn test_issuer() -> Arc<CredentialIssuer> {
    Arc::new(CredentialIssuer::new(test_settings()))
}

pub fn test_gate(store: &MemoryKvStore) -> VerificationGate<MemoryKvStore> {
    VerificationGate {
        store: store.clone(),
        ttl: Duration::from_secs(300),
    }
}

pub fn test_ledger(store: &MemoryKvStore, total: u32) -> QuotaLedger<MemoryKvStore> {
    QuotaLedger {
        store: store.clone(),
        policy: QuotaPolicy {
            anonymous_total: total,
            anonymous_window_days: 7,
            user_weekly_total: total,
        },
    }
}

pub fn phone() -> ContactIdentifier {
    ContactIdentifier::parse(TEST_PHONE).unwrap()
}

pub fn test_subject(contact: &ContactIdentifier) -> Subject {
    Subject::new(contact, Some("seer".to_owned()))
}
