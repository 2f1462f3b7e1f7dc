//! Default schema validator.

use crate::relay::{
    domain::ChatMessage, error::ValidationError, ports::SchemaValidator, validation::rules,
};

/// Default implementation of the [`SchemaValidator`] port.
///
/// Applies every structural rule and reports all violations together.
///
/// # Examples
///
/// ```
/// use chat_relay::relay::domain::{ChatMessage, InboundMessage};
/// use chat_relay::relay::ports::SchemaValidator;
/// use chat_relay::relay::validation::DefaultSchemaValidator;
/// use mockable::DefaultClock;
///
/// let message = ChatMessage::normalize(InboundMessage::new("u1", "hello"), &DefaultClock);
/// assert!(DefaultSchemaValidator::new().validate(&message).is_ok());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemaValidator;

impl DefaultSchemaValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaValidator for DefaultSchemaValidator {
    fn validate(&self, message: &ChatMessage) -> Result<(), ValidationError> {
        let errors: Vec<ValidationError> = [
            rules::validate_message_id(message),
            rules::validate_author(message),
            rules::validate_content_not_empty(message),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        ValidationError::combine(errors).map_or(Ok(()), Err)
    }
}
