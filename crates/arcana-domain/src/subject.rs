//! Subject and contact identifier types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::SubjectId;

/// An account that can hold credentials and a weekly quota.
///
/// At least one of `email` / `phone` is always set. Profile mutation happens
/// outside the session service; it only reads subjects and creates them on
/// first login or explicit registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nickname: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subject {
    /// Build a new active subject reachable through `contact`.
    pub fn new(contact: &ContactIdentifier, nickname: Option<String>) -> Self {
        let (email, phone) = match contact {
            ContactIdentifier::Email(e) => (Some(e.clone()), None),
            ContactIdentifier::Phone(p) => (None, Some(p.clone())),
        };
        Self {
            id: SubjectId::generate(),
            email,
            phone,
            nickname,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Errors from [`ContactIdentifier::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("email or phone is required")]
    Missing,
    #[error("malformed email address")]
    MalformedEmail,
    #[error("malformed phone number")]
    MalformedPhone,
}

/// Contact identifier a verification code is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactIdentifier {
    Email(String),
    Phone(String),
}

const PHONE_MIN_DIGITS: usize = 6;
/// Column widths of the subject store; the whole string counts, `+` included.
pub const PHONE_MAX_LEN: usize = 20;
pub const EMAIL_MAX_LEN: usize = 255;

impl ContactIdentifier {
    /// Parse a raw identifier. Anything containing `@` is treated as an email.
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(IdentifierError::Missing);
        }
        if raw.contains('@') {
            let mut parts = raw.split('@');
            let local = parts.next().unwrap_or_default();
            let domain = parts.next().unwrap_or_default();
            if raw.len() > EMAIL_MAX_LEN
                || local.is_empty()
                || domain.is_empty()
                || parts.next().is_some()
            {
                return Err(IdentifierError::MalformedEmail);
            }
            return Ok(Self::Email(raw.to_owned()));
        }
        let digits = raw.strip_prefix('+').unwrap_or(raw);
        let valid = raw.len() <= PHONE_MAX_LEN
            && digits.len() >= PHONE_MIN_DIGITS
            && digits.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(IdentifierError::MalformedPhone);
        }
        Ok(Self::Phone(raw.to_owned()))
    }

    /// Pick the identifier from an `{email?, phone?}` pair; email wins when both are set.
    pub fn from_parts(email: Option<&str>, phone: Option<&str>) -> Result<Self, IdentifierError> {
        fn pick(v: Option<&str>) -> Option<&str> {
            v.map(str::trim).filter(|v| !v.is_empty())
        }
        match (pick(email), pick(phone)) {
            (Some(email), _) => Self::parse(email),
            (None, Some(phone)) => Self::parse(phone),
            (None, None) => Err(IdentifierError::Missing),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(v) | Self::Phone(v) => v,
        }
    }

    /// Up to `n` trailing ASCII digits of the identifier, in order.
    pub fn trailing_digits(&self, n: usize) -> String {
        let digits: Vec<char> = self
            .as_str()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        digits[digits.len().saturating_sub(n)..].iter().collect()
    }

    /// Redacted rendering for log lines.
    pub fn masked(&self) -> String {
        match self {
            Self::Email(v) => {
                let (local, domain) = v.split_once('@').unwrap_or((v.as_str(), ""));
                let head: String = local.chars().take(2).collect();
                format!("{head}***@{domain}")
            }
            Self::Phone(_) => format!("***{}", self.trailing_digits(4)),
        }
    }
}

impl fmt::Display for ContactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
