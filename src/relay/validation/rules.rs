//! Individual validation rule implementations.
//!
//! Each rule is a pure function checking one aspect of a normalized message,
//! returning `Ok(())` on success or a specific [`ValidationError`].

use crate::relay::{domain::ChatMessage, error::ValidationError};

/// Maximum accepted length of a message identifier.
pub const MAX_MESSAGE_ID_LEN: usize = 128;

/// Maximum accepted length of an author identifier.
pub const MAX_AUTHOR_LEN: usize = 256;

/// Validates that the content does not exceed `limit` UTF-8 bytes.
///
/// # Errors
///
/// Returns `ValidationError::ContentTooLong` when the limit is exceeded.
pub fn validate_content_length(message: &ChatMessage, limit: usize) -> Result<(), ValidationError> {
    let actual = message.content_len();
    if actual > limit {
        return Err(ValidationError::ContentTooLong { actual, limit });
    }
    Ok(())
}

/// Validates that the identifier is present and within the storage limit.
///
/// # Errors
///
/// Returns `ValidationError::MissingMessageId` or
/// `ValidationError::MessageIdTooLong`.
pub fn validate_message_id(message: &ChatMessage) -> Result<(), ValidationError> {
    if message.id().is_blank() {
        return Err(ValidationError::MissingMessageId);
    }
    if message.id().as_str().chars().count() > MAX_MESSAGE_ID_LEN {
        return Err(ValidationError::MessageIdTooLong {
            limit: MAX_MESSAGE_ID_LEN,
        });
    }
    Ok(())
}

/// Validates that the author is present and within the storage limit.
///
/// # Errors
///
/// Returns `ValidationError::MissingAuthor` or `ValidationError::AuthorTooLong`.
pub fn validate_author(message: &ChatMessage) -> Result<(), ValidationError> {
    if message.author().trim().is_empty() {
        return Err(ValidationError::MissingAuthor);
    }
    if message.author().chars().count() > MAX_AUTHOR_LEN {
        return Err(ValidationError::AuthorTooLong {
            limit: MAX_AUTHOR_LEN,
        });
    }
    Ok(())
}

/// Validates that the content is not blank.
///
/// # Errors
///
/// Returns `ValidationError::EmptyContent` for empty or whitespace-only text.
pub fn validate_content_not_empty(message: &ChatMessage) -> Result<(), ValidationError> {
    if message.content().trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}
