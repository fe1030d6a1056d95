//! Credential claims and uniform JWT validation.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "USE_ONLY_IN_SESSION_SERVICE", test))]
use serde::Serialize;

use arcana_domain::id::SubjectId;

/// Which half of a credential pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_SESSION_SERVICE", test), derive(Serialize))]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// The only failure [`decode_claims`] reports.
///
/// Bad signature, malformed payload, wrong algorithm and expiry all collapse
/// into this one value so callers cannot tell which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid credential")]
pub struct InvalidCredential;

/// JWT claims payload shared by the issuer (session service) and every validator.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | subject id (UUID string) |
/// | `kind` | custom | `"access"` or `"refresh"` |
/// | `iat` | `iat` | issued at, seconds since epoch |
/// | `exp` | `exp` | expiry, seconds since epoch |
///
/// [`Serialize`] requires the **`USE_ONLY_IN_SESSION_SERVICE`** feature: only the
/// session service mints tokens.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(any(feature = "USE_ONLY_IN_SESSION_SERVICE", test), derive(Serialize))]
pub struct Claims {
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Identity asserted by a token that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject_id: SubjectId,
    pub kind: TokenKind,
    pub expires_at: i64,
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Decode and validate a token against `now` (seconds since epoch).
///
/// Zero leeway: a token whose `exp` is at or before `now` is rejected. Expiry
/// is checked against `now` only, never the system clock.
pub fn decode_claims(
    token: &str,
    secret: &[u8],
    algorithm: Algorithm,
    now: i64,
) -> Result<Claims, InvalidCredential> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|_| InvalidCredential)?;

    if data.claims.exp <= now {
        return Err(InvalidCredential);
    }
    Ok(data.claims)
}

/// Validate a token of either kind and parse its subject.
pub fn verify_token_at(
    token: &str,
    secret: &[u8],
    algorithm: Algorithm,
    now: i64,
) -> Result<VerifiedToken, InvalidCredential> {
    let claims = decode_claims(token, secret, algorithm, now)?;
    let subject_id = claims
        .sub
        .parse::<SubjectId>()
        .map_err(|_| InvalidCredential)?;
    Ok(VerifiedToken {
        subject_id,
        kind: claims.kind,
        expires_at: claims.exp,
    })
}

/// Validate an access token presented on a metered call.
///
/// Refresh tokens are rejected here; they are only good for minting new access tokens.
pub fn validate_access_token(
    token: &str,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<VerifiedToken, InvalidCredential> {
    let verified = verify_token_at(token, secret, algorithm, now_secs())?;
    if verified.kind != TokenKind::Access {
        return Err(InvalidCredential);
    }
    Ok(verified)
}

/// Sign claims. Session service only.
#[cfg(any(feature = "USE_ONLY_IN_SESSION_SERVICE", test))]
pub fn encode_claims(
    claims: &Claims,
    secret: &[u8],
    algorithm: Algorithm,
) -> Result<String, jsonwebtoken::errors::Error> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    encode(
        &Header::new(algorithm),
        claims,
        &EncodingKey::from_secret(secret),
    )
}
