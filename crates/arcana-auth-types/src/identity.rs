//! `Authorization: Bearer` extractor.

use axum::extract::FromRequestParts;
use http::StatusCode;
use http::header::AUTHORIZATION;
use http::request::Parts;

/// Raw bearer token from the `Authorization` header, if one was sent.
///
/// Only the header shape is checked here; the token itself is validated by
/// the handler. Returns 401 when the header is present but is not
/// `Bearer <token>`, so a broken credential never silently downgrades to an
/// anonymous call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    // Extract synchronously and return a 'static future; `async fn` here trips
    // the lifetime capture rules of the axum-core trait signature.
    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().map(str::to_owned));

        async move {
            let Some(value) = header else {
                return Ok(Self(None));
            };
            let value = value.map_err(|_| StatusCode::UNAUTHORIZED)?;
            let token = value
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(StatusCode::UNAUTHORIZED)?;
            Ok(Self(Some(token.to_owned())))
        }
    }
}
