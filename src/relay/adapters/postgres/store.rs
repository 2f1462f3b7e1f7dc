//! `PostgreSQL` implementation of the [`MessageStore`] port.

use async_trait::async_trait;
use diesel::prelude::*;

use super::blocking_helpers::{RelayPgPool, run_blocking_with};
use super::models::{ChatMessageRow, NewChatMessageRow};
use super::schema::chat_messages;
use crate::relay::{
    domain::ChatMessage,
    ports::{MessageStore, StoreError, StoreResult, UpsertOutcome},
};

/// `PostgreSQL`-backed message store.
///
/// Idempotence rests on the `chat_messages` primary key: an upsert is an
/// `INSERT … ON CONFLICT (id) DO NOTHING`, so the first stored version of a
/// record wins even when two relay instances race.
///
/// # Example
///
/// ```ignore
/// use chat_relay::relay::adapters::postgres::{PostgresMessageStore, build_pool};
///
/// let pool = build_pool("postgres://...", 8).expect("pool");
/// let store = PostgresMessageStore::new(pool);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresMessageStore {
    pool: RelayPgPool,
}

impl PostgresMessageStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub const fn new(pool: RelayPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking_with(&self.pool, f, StoreError::Connection).await
    }
}

/// Maps the affected row count of a conflict-ignoring insert.
pub(super) const fn upsert_outcome(affected_rows: usize) -> UpsertOutcome {
    if affected_rows == 0 {
        UpsertOutcome::AlreadyPresent
    } else {
        UpsertOutcome::Inserted
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn upsert(&self, message: &ChatMessage) -> StoreResult<UpsertOutcome> {
        let row = NewChatMessageRow::from(message);

        self.run_blocking(move |connection| {
            let affected = diesel::insert_into(chat_messages::table)
                .values(&row)
                .on_conflict(chat_messages::id)
                .do_nothing()
                .execute(connection)
                .map_err(StoreError::persistence)?;
            Ok(upsert_outcome(affected))
        })
        .await
    }

    async fn read_all(&self) -> StoreResult<Vec<ChatMessage>> {
        self.run_blocking(|connection| {
            let rows = chat_messages::table
                .order((chat_messages::created_at.asc(), chat_messages::stored_seq.asc()))
                .select(ChatMessageRow::as_select())
                .load::<ChatMessageRow>(connection)
                .map_err(StoreError::persistence)?;
            Ok(rows.into_iter().map(ChatMessage::from).collect())
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.run_blocking(|connection| {
            diesel::sql_query("SELECT 1")
                .execute(connection)
                .map_err(StoreError::persistence)?;
            Ok(())
        })
        .await
    }
}
