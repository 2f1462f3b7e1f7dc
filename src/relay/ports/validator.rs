//! Schema validation port.

use crate::relay::{domain::ChatMessage, error::ValidationError};

/// Validates a normalized message before publication.
///
/// Implementations should collect every violation rather than stopping at
/// the first one, returning [`ValidationError::Multiple`] when more than one
/// rule fails.
pub trait SchemaValidator: Send + Sync {
    /// Validates a message.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] describing the violations.
    fn validate(&self, message: &ChatMessage) -> Result<(), ValidationError>;
}
