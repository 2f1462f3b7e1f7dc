//! Message bus transport port.
//!
//! A bus is a durable, ordered, append-only log per topic. This port exposes
//! only single-shot operations; retry, backoff and decoding policy live in
//! [`crate::relay::services::BusClient`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for bus transport operations.
pub type BusResult<T> = Result<T, BusError>;

/// A payload read from a topic together with its log position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDelivery {
    /// Position of the record within its topic.
    pub offset: i64,
    /// Partitioning key the record was published with.
    pub key: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// Bus transport contract.
///
/// Implementations must be safe for concurrent use by many publishers.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Appends one payload to `topic`. Makes a single attempt.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] when the bus rejects or cannot be reached.
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Opens a reader on `topic` positioned after the last record committed
    /// by `consumer`.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] when the reader cannot be established.
    async fn open_reader(&self, topic: &str, consumer: &str) -> BusResult<Box<dyn BusReader>>;
}

/// A long-lived reader over one topic.
///
/// Delivery is at-least-once: the position of a delivered record is committed
/// when the next record is requested, so a record handed out just before a
/// crash is delivered again after restart.
#[async_trait]
pub trait BusReader: Send {
    /// Waits for the next record.
    ///
    /// Returns `Ok(None)` once the topic is closed and fully drained.
    /// Callers cancel a pending wait by dropping the future.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] on an unrecoverable read failure.
    async fn next_delivery(&mut self) -> BusResult<Option<BusDelivery>>;
}

/// Errors returned by bus transport adapters.
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// The bus could not be reached.
    #[error("bus unavailable: {0}")]
    Unavailable(String),

    /// A single attempt exceeded its deadline.
    #[error("bus operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The reader's topic was closed.
    #[error("bus topic {0} is closed")]
    Closed(String),

    /// Generic transport failure.
    #[error("bus transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl BusError {
    /// Wraps a transport error from a bus adapter.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<diesel::result::Error> for BusError {
    fn from(err: diesel::result::Error) -> Self {
        Self::transport(err)
    }
}
