use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::domain::types::{
    DEFAULT_ANONYMOUS_QUOTA_DAYS, DEFAULT_CODE_TTL_SECS, DEFAULT_FREE_QUOTA, QuotaPolicy,
};
use crate::usecase::credential::CredentialSettings;

/// Session service configuration loaded from environment variables.
pub struct SessionConfig {
    /// PostgreSQL connection URL for the subject store.
    pub database_url: String,
    /// Redis connection URL for codes and quota counters.
    pub redis_url: String,
    /// HMAC secret for signing access and refresh tokens.
    pub jwt_secret: String,
    /// Signing algorithm (default HS256). Env var: `JWT_ALGORITHM`.
    pub jwt_algorithm: Algorithm,
    /// Access-token lifetime in minutes (default 15).
    pub access_token_expire_minutes: i64,
    /// Refresh-token lifetime in days (default 7).
    pub refresh_token_expire_days: i64,
    /// Verification-code lifetime in seconds (default 300).
    pub verification_code_ttl_secs: u64,
    /// Anonymous allotment per device (default 3).
    pub anonymous_free_quota: u32,
    /// Days an anonymous counter lives before it is recreated (default 7).
    pub anonymous_quota_days: u32,
    /// Weekly allotment per subject (default 3).
    pub user_free_quota_weekly: u32,
    /// Upper bound on every key-value store call in milliseconds (default 500).
    pub store_timeout_ms: u64,
    /// TCP port to listen on (default 8000). Env var: `SESSION_PORT`.
    pub session_port: u16,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Accept only the HMAC family; the service signs with a shared secret.
pub fn parse_hmac_algorithm(value: &str) -> Result<Algorithm, String> {
    let algorithm = Algorithm::from_str(value.trim()).map_err(|e| e.to_string())?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        other => Err(format!("{other:?} needs a key pair; use HS256, HS384 or HS512")),
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let jwt_algorithm = std::env::var("JWT_ALGORITHM")
            .map(|v| parse_hmac_algorithm(&v).expect("invalid JWT_ALGORITHM"))
            .unwrap_or(Algorithm::HS256);

        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET"),
            jwt_algorithm,
            access_token_expire_minutes: env_or("ACCESS_TOKEN_EXPIRE_MINUTES", 15),
            refresh_token_expire_days: env_or("REFRESH_TOKEN_EXPIRE_DAYS", 7),
            verification_code_ttl_secs: env_or(
                "VERIFICATION_CODE_TTL_SECS",
                DEFAULT_CODE_TTL_SECS,
            ),
            anonymous_free_quota: env_or("ANONYMOUS_FREE_QUOTA", DEFAULT_FREE_QUOTA),
            anonymous_quota_days: env_or("ANONYMOUS_QUOTA_DAYS", DEFAULT_ANONYMOUS_QUOTA_DAYS),
            user_free_quota_weekly: env_or("USER_FREE_QUOTA_WEEKLY", DEFAULT_FREE_QUOTA),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", 500),
            session_port: env_or("SESSION_PORT", 8000),
        }
    }

    pub fn credential_settings(&self) -> CredentialSettings {
        CredentialSettings {
            secret: self.jwt_secret.clone().into_bytes(),
            algorithm: self.jwt_algorithm,
            access_ttl: chrono::Duration::minutes(self.access_token_expire_minutes),
            refresh_ttl: chrono::Duration::days(self.refresh_token_expire_days),
        }
    }

    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            anonymous_total: self.anonymous_free_quota,
            anonymous_window_days: self.anonymous_quota_days,
            user_weekly_total: self.user_free_quota_weekly,
        }
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::from_secs(self.verification_code_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

// Hand-written so the signing secret never reaches a log line.
impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("refresh_token_expire_days", &self.refresh_token_expire_days)
            .field("verification_code_ttl_secs", &self.verification_code_ttl_secs)
            .field("anonymous_free_quota", &self.anonymous_free_quota)
            .field("anonymous_quota_days", &self.anonymous_quota_days)
            .field("user_free_quota_weekly", &self.user_free_quota_weekly)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("session_port", &self.session_port)
            .finish_non_exhaustive()
    }
}
