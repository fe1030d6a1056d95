use chrono::{DateTime, Utc};
use serde::Serialize;

use arcana_domain::id::SubjectId;

use crate::error::SessionError;

/// Verification code length in decimal digits.
pub const VERIFICATION_CODE_LEN: usize = 6;

/// Verification code time-to-live in seconds.
pub const DEFAULT_CODE_TTL_SECS: u64 = 300;

/// Default allotment for both scope kinds.
pub const DEFAULT_FREE_QUOTA: u32 = 3;

/// Lifetime of an anonymous quota record in days.
pub const DEFAULT_ANONYMOUS_QUOTA_DAYS: u32 = 7;

/// Longest accepted device fingerprint.
pub const MAX_FINGERPRINT_LEN: usize = 255;

pub const VERIFY_CODE_PREFIX: &str = "verify_code:";
pub const ANONYMOUS_QUOTA_PREFIX: &str = "anonymous_quota:";
pub const USER_QUOTA_PREFIX: &str = "user_quota:";

pub fn verification_key(identifier: &str) -> String {
    format!("{VERIFY_CODE_PREFIX}{identifier}")
}

/// Which kind of caller a quota counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    Anonymous,
    User,
}

/// Isolation boundary for a quota counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaScope {
    /// Keyed by device fingerprint; fixed allotment until the record expires.
    Anonymous(String),
    /// Keyed by subject id; allotment refills every Monday.
    User(SubjectId),
}

impl QuotaScope {
    /// Anonymous scope for a client-supplied fingerprint.
    pub fn anonymous(fingerprint: &str) -> Result<Self, SessionError> {
        let fingerprint = fingerprint.trim();
        if fingerprint.is_empty() {
            return Err(SessionError::InvalidIdentifier(
                "device fingerprint is required".to_owned(),
            ));
        }
        if fingerprint.len() > MAX_FINGERPRINT_LEN {
            return Err(SessionError::InvalidIdentifier(
                "device fingerprint is too long".to_owned(),
            ));
        }
        Ok(Self::Anonymous(fingerprint.to_owned()))
    }

    pub fn kind(&self) -> QuotaKind {
        match self {
            Self::Anonymous(_) => QuotaKind::Anonymous,
            Self::User(_) => QuotaKind::User,
        }
    }

    /// Store key for this scope's counter.
    pub fn key(&self) -> String {
        match self {
            Self::Anonymous(fingerprint) => format!("{ANONYMOUS_QUOTA_PREFIX}{fingerprint}"),
            Self::User(id) => format!("{USER_QUOTA_PREFIX}{id}"),
        }
    }
}

/// Quota state as seen by a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaRecord {
    pub scope_key: String,
    pub kind: QuotaKind,
    pub remaining: u32,
    pub total: u32,
    /// ISO date (user scope) or RFC 3339 timestamp (anonymous scope).
    pub window_start: String,
    /// Next refill; always `None` for anonymous scopes.
    pub reset_at: Option<DateTime<Utc>>,
}

/// Allotments and windows applied when a counter is created or refilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub anonymous_total: u32,
    pub anonymous_window_days: u32,
    pub user_weekly_total: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            anonymous_total: DEFAULT_FREE_QUOTA,
            anonymous_window_days: DEFAULT_ANONYMOUS_QUOTA_DAYS,
            user_weekly_total: DEFAULT_FREE_QUOTA,
        }
    }
}
