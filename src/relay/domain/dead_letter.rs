//! Dead-letter envelope for records that could not be persisted.

use super::ChatMessage;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Reason attached to records whose durable upsert failed in the relay loop.
pub const PERSIST_FAILURE: &str = "persist_failure";

/// A write-once record of a message that failed durable persistence.
///
/// Entries are published to the dead-letter topic and consumed out-of-band;
/// nothing in this crate replays them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    /// The message that failed.
    pub message: ChatMessage,
    /// Why it failed.
    pub reason: String,
    /// When the failure was recorded.
    pub failed_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    /// Creates an entry stamped with the current time from `clock`.
    #[must_use]
    pub fn new(message: ChatMessage, reason: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            message,
            reason: reason.into(),
            failed_at: clock.utc(),
        }
    }

    /// Encodes the entry as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
