//! Input rejection errors for the ingress path.
//!
//! Uses `thiserror` for typed variants that callers can inspect; every
//! variant maps to a synchronous rejection that is never retried and never
//! published.

use thiserror::Error;

/// Reasons an inbound message is rejected before reaching the bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The payload could not be decoded as a message.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The content exceeds the configured maximum length.
    #[error("message too long: {actual} bytes exceeds limit of {limit} bytes")]
    ContentTooLong {
        /// Actual length in bytes.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The message identifier is blank after normalization.
    #[error("message ID is required")]
    MissingMessageId,

    /// The message identifier is longer than the storage limit.
    #[error("message ID exceeds {limit} characters")]
    MessageIdTooLong {
        /// Maximum identifier length.
        limit: usize,
    },

    /// The author is empty or whitespace-only.
    #[error("author is required")]
    MissingAuthor,

    /// The author exceeds the storage limit.
    #[error("author exceeds {limit} characters")]
    AuthorTooLong {
        /// Maximum author length.
        limit: usize,
    },

    /// The content is empty or whitespace-only.
    #[error("message content cannot be empty")]
    EmptyContent,

    /// Multiple validation errors occurred.
    #[error("multiple validation errors: {}", format_errors(.0))]
    Multiple(Vec<Self>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Combines collected errors, unwrapping a single error.
    ///
    /// Returns `None` when `errors` is empty.
    #[must_use]
    pub fn combine(mut errors: Vec<Self>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multiple(errors)),
        }
    }

    /// Returns the individual errors if this is a `Multiple` variant.
    #[must_use]
    pub fn errors(&self) -> Option<&[Self]> {
        match self {
            Self::Multiple(errors) => Some(errors),
            _ => None,
        }
    }
}
