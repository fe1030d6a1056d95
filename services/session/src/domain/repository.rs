#![allow(async_fn_in_trait)]

use arcana_domain::id::SubjectId;
use arcana_domain::subject::{ContactIdentifier, Subject};

use crate::error::SessionError;

/// Port to the subject store. Profile data is owned elsewhere; the session
/// service only reads subjects and creates them on first login or registration.
pub trait SubjectRepository: Send + Sync {
    /// Exact match on email OR phone.
    async fn find_by_contact(
        &self,
        contact: &ContactIdentifier,
    ) -> Result<Option<Subject>, SessionError>;

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, SessionError>;

    /// Insert a new subject. Fails with `SubjectConflict` if its email or phone is taken.
    async fn create(&self, subject: &Subject) -> Result<(), SessionError>;
}
