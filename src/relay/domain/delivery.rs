//! Ingestion origins and acknowledgement shapes.

use super::{ConnectionId, MessageId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an inbound message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressOrigin {
    /// A one-shot request (for example an HTTP `POST`).
    OneShot,
    /// A frame read from a live connection registered in the hub.
    Live(ConnectionId),
}

impl IngressOrigin {
    /// Returns the originating connection for live ingestion.
    #[must_use]
    pub const fn connection(self) -> Option<ConnectionId> {
        match self {
            Self::OneShot => None,
            Self::Live(id) => Some(id),
        }
    }
}

/// How an accepted message was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IngestStatus {
    /// Published to the bus; the relay loop broadcasts and persists it.
    #[serde(rename = "enqueued")]
    Enqueued,
    /// The bus was unreachable; broadcast and persisted locally.
    #[serde(rename = "broadcasted-fallback")]
    BroadcastedFallback,
}

impl IngestStatus {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::BroadcastedFallback => "broadcasted-fallback",
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement returned for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAck {
    /// Identifier assigned to (or supplied with) the message.
    #[serde(rename = "message_id")]
    pub id: MessageId,
    /// Delivery path taken.
    pub status: IngestStatus,
}
