use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::Pool as RedisPool;
use sea_orm::DatabaseConnection;

use crate::domain::types::QuotaPolicy;
use crate::infra::db::DbSubjectRepository;
use crate::infra::redis::RedisKvStore;
use crate::usecase::credential::CredentialIssuer;
use crate::usecase::quota::QuotaLedger;
use crate::usecase::verification::VerificationGate;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub redis: RedisPool,
    pub issuer: Arc<CredentialIssuer>,
    pub code_ttl: Duration,
    pub quota_policy: QuotaPolicy,
    pub store_timeout: Duration,
}

impl AppState {
    pub fn subject_repo(&self) -> DbSubjectRepository {
        DbSubjectRepository {
            db: self.db.clone(),
        }
    }

    pub fn kv_store(&self) -> RedisKvStore {
        RedisKvStore {
            pool: self.redis.clone(),
            timeout: self.store_timeout,
        }
    }

    pub fn verification_gate(&self) -> VerificationGate<RedisKvStore> {
        VerificationGate {
            store: self.kv_store(),
            ttl: self.code_ttl,
        }
    }

    pub fn quota_ledger(&self) -> QuotaLedger<RedisKvStore> {
        QuotaLedger {
            store: self.kv_store(),
            policy: self.quota_policy,
        }
    }
}
