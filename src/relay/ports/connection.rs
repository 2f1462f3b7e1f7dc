//! Live subscriber connection port.

use crate::relay::domain::{ChatMessage, ConnectionId, IngestAck};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// A frame written to a live connection.
///
/// Serialized untagged: a relayed message goes out as the bare message
/// object so existing clients can render it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// A relayed chat message.
    Message(ChatMessage),
    /// Acknowledgement of a message the connection itself sent.
    Ack(IngestAck),
    /// Rejection of a message the connection itself sent.
    Rejected {
        /// Human-readable rejection reason.
        error: String,
    },
}

/// Handle to one live duplex connection.
///
/// The hub owns registered handles and is the only caller of
/// [`SubscriberConnection::close`] for them.
#[async_trait]
pub trait SubscriberConnection: Send + Sync {
    /// Returns the connection identifier.
    fn id(&self) -> ConnectionId;

    /// Writes one frame. Callers bound the call with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] when the write fails.
    async fn send(&self, frame: &OutboundFrame) -> Result<(), ConnectionError>;

    /// Closes the underlying connection.
    async fn close(&self);
}

/// Errors raised while writing to a connection.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// The peer has gone away.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// The write did not complete in time.
    #[error("write to connection {0} timed out")]
    Timeout(ConnectionId),

    /// The frame could not be encoded.
    #[error("frame encoding failed: {0}")]
    Encoding(String),

    /// Transport-level write failure.
    #[error("connection write error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConnectionError {
    /// Wraps a transport write error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
