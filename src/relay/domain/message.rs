//! The relayed chat message record and its inbound, not-yet-normalized form.

use super::MessageId;
use crate::relay::error::ValidationError;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A normalized chat message as it travels through bus, hub and store.
///
/// The serialized form keeps the field names spoken by existing clients
/// (`message_id`, `user_id`, `content`, `timestamp`).
///
/// # Invariants
///
/// - `id` is non-blank once a record leaves the ingress path
/// - `created_at` was stamped by the ingesting process's clock
///
/// # Examples
///
/// ```
/// use chat_relay::relay::domain::{ChatMessage, InboundMessage};
/// use mockable::DefaultClock;
///
/// let inbound = InboundMessage::from_json(br#"{"user_id":"u1","content":"hi"}"#)
///     .expect("valid payload");
/// let message = ChatMessage::normalize(inbound, &DefaultClock);
///
/// assert_eq!(message.author(), "u1");
/// assert!(!message.id().is_blank());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "message_id")]
    id: MessageId,
    #[serde(rename = "user_id")]
    author: String,
    content: String,
    #[serde(rename = "timestamp")]
    created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Reconstructs a message from already-normalized parts.
    ///
    /// Used by persistence adapters and tests; ingestion goes through
    /// [`ChatMessage::normalize`].
    #[must_use]
    pub fn new(
        id: MessageId,
        author: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            author: author.into(),
            content: content.into(),
            created_at,
        }
    }

    /// Normalizes an inbound payload into a relayable record.
    ///
    /// A blank or missing identifier is replaced with a generated one. The
    /// creation timestamp always comes from `clock`; client-supplied
    /// timestamps are discarded.
    #[must_use]
    pub fn normalize(inbound: InboundMessage, clock: &impl Clock) -> Self {
        let id = inbound
            .id
            .filter(|id| !id.is_blank())
            .unwrap_or_else(MessageId::generate);

        Self {
            id,
            author: inbound.author,
            content: inbound.content,
            created_at: clock.utc(),
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    /// Returns the author (user) identifier.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the message text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when the ingesting process normalized the message.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the content length in UTF-8 bytes.
    #[must_use]
    pub const fn content_len(&self) -> usize {
        self.content.len()
    }

    /// Encodes the message as a JSON payload for the bus or a socket frame.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes a message previously produced by [`ChatMessage::to_json`].
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the payload is not a message record.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// A message as submitted by a client, before normalization.
///
/// Every field is optional on the wire; missing text fields decode as empty
/// strings and are rejected later by schema validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    /// Client-supplied identifier, if any.
    #[serde(default, rename = "message_id")]
    pub id: Option<MessageId>,
    /// Author identifier.
    #[serde(default, rename = "user_id")]
    pub author: String,
    /// Message text.
    #[serde(default)]
    pub content: String,
    /// Client-supplied timestamp; accepted on the wire but never trusted.
    #[serde(default, rename = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Creates an inbound message with the given author and content.
    #[must_use]
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets a client-supplied identifier.
    #[must_use]
    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = Some(id);
        self
    }

    /// Parses a raw JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedPayload`] when the bytes are not a
    /// JSON object of the expected shape.
    pub fn from_json(payload: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(payload)
            .map_err(|err| ValidationError::MalformedPayload(err.to_string()))
    }
}
