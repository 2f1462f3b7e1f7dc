//! In-memory message store for tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::relay::{
    domain::{ChatMessage, MessageId},
    ports::{MessageStore, StoreError, StoreResult, UpsertOutcome},
};

/// Thread-safe in-memory message store.
///
/// Uniqueness is enforced by an identifier index held under the same lock as
/// the records, so concurrent upserts of one identifier insert once.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    messages: Vec<ChatMessage>,
    ids: HashSet<MessageId>,
    failure: Option<String>,
}

fn lock_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with `reason` until [`Self::recover`].
    ///
    /// # Errors
    ///
    /// Returns store errors when lock acquisition fails.
    pub fn set_failing(&self, reason: impl Into<String>) -> StoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.failure = Some(reason.into().trim().to_owned());
        Ok(())
    }

    /// Clears an injected failure.
    ///
    /// # Errors
    ///
    /// Returns store errors when lock acquisition fails.
    pub fn recover(&self) -> StoreResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.failure = None;
        Ok(())
    }

    /// Returns the number of stored messages.
    ///
    /// # Errors
    ///
    /// Returns store errors when lock acquisition fails.
    pub fn len(&self) -> StoreResult<usize> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.messages.len())
    }

    /// Returns `true` when nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns store errors when lock acquisition fails.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn check_failure(state: &InMemoryStoreState) -> StoreResult<()> {
    state
        .failure
        .as_ref()
        .map_or(Ok(()), |reason| Err(StoreError::connection(reason.clone())))
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn upsert(&self, message: &ChatMessage) -> StoreResult<UpsertOutcome> {
        let mut state = self.state.write().map_err(lock_error)?;
        check_failure(&state)?;

        if !state.ids.insert(message.id().clone()) {
            return Ok(UpsertOutcome::AlreadyPresent);
        }
        state.messages.push(message.clone());
        Ok(UpsertOutcome::Inserted)
    }

    async fn read_all(&self) -> StoreResult<Vec<ChatMessage>> {
        let state = self.state.read().map_err(lock_error)?;
        check_failure(&state)?;

        let mut messages = state.messages.clone();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by_key(ChatMessage::created_at);
        Ok(messages)
    }

    async fn ping(&self) -> StoreResult<()> {
        let state = self.state.read().map_err(lock_error)?;
        check_failure(&state)
    }
}
