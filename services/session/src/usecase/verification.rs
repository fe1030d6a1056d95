use std::time::Duration;

use rand::RngExt;

use arcana_domain::subject::ContactIdentifier;

use crate::domain::store::{KvStore, Take};
use crate::domain::types::{VERIFICATION_CODE_LEN, verification_key};
use crate::error::SessionError;

/// `len` independent uniform decimal digits; leading zeros allowed.
pub fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

pub fn generate_code() -> String {
    random_digits(VERIFICATION_CODE_LEN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub code: String,
    pub ttl_seconds: u64,
}

/// One outstanding single-use code per contact identifier.
pub struct VerificationGate<S: KvStore> {
    pub store: S,
    pub ttl: Duration,
}

impl<S: KvStore> VerificationGate<S> {
    /// Issue a fresh code, replacing any unconsumed one for `identifier`.
    pub async fn issue_code(
        &self,
        identifier: &ContactIdentifier,
    ) -> Result<IssuedCode, SessionError> {
        let code = generate_code();
        self.store
            .put_with_ttl(&verification_key(identifier.as_str()), &code, self.ttl)
            .await?;
        tracing::info!(
            identifier = %identifier.masked(),
            ttl_secs = self.ttl.as_secs(),
            "verification code issued"
        );
        Ok(IssuedCode {
            code,
            ttl_seconds: self.ttl.as_secs(),
        })
    }

    /// Consume the code if it matches. A wrong guess leaves the stored code in place.
    pub async fn verify_code(
        &self,
        identifier: &ContactIdentifier,
        submitted: &str,
    ) -> Result<(), SessionError> {
        let key = verification_key(identifier.as_str());
        match self.store.take_if_equal(&key, submitted.trim()).await? {
            Take::Taken => Ok(()),
            Take::Missing => Err(SessionError::CodeNotFound),
            Take::Mismatch => Err(SessionError::CodeMismatch),
        }
    }
}
