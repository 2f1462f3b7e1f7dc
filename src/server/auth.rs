//! Bearer-token extraction for one-shot requests.

use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::relay::ports::{AuthError, TokenVerifier};

const BEARER_PREFIX: &str = "Bearer ";

/// Returns the token carried by an `Authorization: Bearer …` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.trim().is_empty())
}

/// Verifies the bearer token on a request.
///
/// # Errors
///
/// Returns [`AuthError::MissingToken`] when no usable bearer token is present,
/// otherwise whatever the verifier reports.
pub async fn authorize(verifier: &dyn TokenVerifier, headers: &HeaderMap) -> Result<(), AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    verifier.verify(token).await
}
