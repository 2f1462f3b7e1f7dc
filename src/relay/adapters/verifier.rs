//! Token verifier backed by a configured set of accepted tokens.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::relay::ports::{AuthError, TokenVerifier};

/// Accepts exactly the tokens it was configured with.
///
/// Stands in for an identity-provider verifier in development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashSet<String>,
}

impl StaticTokenVerifier {
    /// Creates a verifier accepting the given tokens; blank entries are
    /// ignored.
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|token| token.trim().to_owned())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, raw_token: &str) -> Result<(), AuthError> {
        let token = raw_token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        if self.tokens.contains(token) {
            Ok(())
        } else {
            Err(AuthError::InvalidToken)
        }
    }
}
