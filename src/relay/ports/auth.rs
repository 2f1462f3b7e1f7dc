//! Token verification port.

use async_trait::async_trait;
use thiserror::Error;

/// Opaque bearer-token verification capability.
///
/// Consulted once per live-connection upgrade and once per one-shot request,
/// before any ingress logic runs. Any error means "unauthenticated".
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies a raw token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the token is missing, unknown or invalid.
    async fn verify(&self, raw_token: &str) -> Result<(), AuthError>;
}

/// Reasons a token is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No token was presented.
    #[error("token not provided")]
    MissingToken,

    /// The token was presented but is not valid.
    #[error("invalid token")]
    InvalidToken,

    /// The verifier itself failed.
    #[error("token verifier unavailable: {0}")]
    Unavailable(String),
}
