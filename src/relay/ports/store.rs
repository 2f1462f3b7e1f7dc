//! Durable store port for message history.

use crate::relay::domain::ChatMessage;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Effect of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The record was new and has been stored.
    Inserted,
    /// A record with the same identifier already existed and was left as is.
    AlreadyPresent,
}

/// Port for durable message history.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - Message identifiers are unique through a structural constraint, so
///   concurrent upserts of one identifier cannot both insert
/// - The first stored version of a record wins; later upserts never modify it
/// - Concurrent access is handled safely
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Inserts the message unless one with the same identifier exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    async fn upsert(&self, message: &ChatMessage) -> StoreResult<UpsertOutcome>;

    /// Returns every stored message ordered by `created_at` ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    async fn read_all(&self) -> StoreResult<Vec<ChatMessage>>;

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store does not respond.
    async fn ping(&self) -> StoreResult<()>;
}

/// Errors returned by store adapters.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store connection error: {0}")]
    Connection(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }
}
