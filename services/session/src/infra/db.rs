use anyhow::Context as _;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, SqlErr,
};

use arcana_domain::id::SubjectId;
use arcana_domain::subject::{ContactIdentifier, Subject};
use arcana_session_schema::subjects;

use crate::domain::repository::SubjectRepository;
use crate::error::SessionError;

#[derive(Clone)]
pub struct DbSubjectRepository {
    pub db: DatabaseConnection,
}

fn store_error(e: DbErr, what: &'static str) -> SessionError {
    SessionError::SubjectStore(anyhow::Error::new(e).context(what))
}

impl SubjectRepository for DbSubjectRepository {
    async fn find_by_contact(
        &self,
        contact: &ContactIdentifier,
    ) -> Result<Option<Subject>, SessionError> {
        // A caller may log in with either channel, so match both columns.
        let value = contact.as_str();
        let model = subjects::Entity::find()
            .filter(
                Condition::any()
                    .add(subjects::Column::Email.eq(value))
                    .add(subjects::Column::Phone.eq(value)),
            )
            .one(&self.db)
            .await
            .map_err(|e| store_error(e, "find subject by contact"))?;
        Ok(model.map(subject_from_model))
    }

    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, SessionError> {
        let model = subjects::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| store_error(e, "find subject by id"))?;
        Ok(model.map(subject_from_model))
    }

    async fn create(&self, subject: &Subject) -> Result<(), SessionError> {
        let result = subjects::ActiveModel {
            id: Set(subject.id.0),
            email: Set(subject.email.clone()),
            phone: Set(subject.phone.clone()),
            nickname: Set(subject.nickname.clone()),
            is_active: Set(subject.active),
            created_at: Set(subject.created_at),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(SessionError::SubjectConflict)
            }
            Err(e) => Err(SessionError::SubjectStore(
                anyhow::Error::new(e).context("insert subject"),
            )),
        }
    }
}

/// Readiness probe for the subject store.
pub async fn ping(db: &DatabaseConnection) -> anyhow::Result<()> {
    db.ping().await.context("ping subject store")
}

fn subject_from_model(m: subjects::Model) -> Subject {
    Subject {
        id: SubjectId(m.id),
        email: m.email,
        phone: m.phone,
        nickname: m.nickname,
        active: m.is_active,
        created_at: m.created_at,
    }
}
