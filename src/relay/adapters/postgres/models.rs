//! Diesel row models for relay persistence.

use super::schema::{bus_consumer_offsets, bus_records, chat_messages};
use crate::relay::domain::{ChatMessage, MessageId};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row for stored chat messages.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessageRow {
    /// Message identifier.
    pub id: String,
    /// Author identifier.
    pub author: String,
    /// Message text.
    pub content: String,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
    /// Insertion sequence.
    pub stored_seq: i64,
}

impl From<ChatMessageRow> for ChatMessage {
    fn from(row: ChatMessageRow) -> Self {
        Self::new(MessageId::new(row.id), row.author, row.content, row.created_at)
    }
}

/// Insert model for chat messages.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessageRow {
    /// Message identifier.
    pub id: String,
    /// Author identifier.
    pub author: String,
    /// Message text.
    pub content: String,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&ChatMessage> for NewChatMessageRow {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id().as_str().to_owned(),
            author: message.author().to_owned(),
            content: message.content().to_owned(),
            created_at: message.created_at(),
        }
    }
}

/// Query result row for bus records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bus_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BusRecordRow {
    /// Log position.
    pub record_offset: i64,
    /// Partitioning key.
    pub record_key: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

/// Insert model for bus records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bus_records)]
pub struct NewBusRecordRow {
    /// Topic name.
    pub topic: String,
    /// Partitioning key.
    pub record_key: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

/// Upsert model for consumer positions.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bus_consumer_offsets)]
pub struct ConsumerOffsetRow {
    /// Consumer name.
    pub consumer: String,
    /// Topic name.
    pub topic: String,
    /// Offset of the last processed record.
    pub committed_offset: i64,
    /// Commit timestamp.
    pub updated_at: DateTime<Utc>,
}
