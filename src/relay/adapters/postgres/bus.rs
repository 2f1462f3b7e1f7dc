//! `PostgreSQL`-backed message bus.
//!
//! Every topic lives in the shared `bus_records` log. Appends to one topic
//! are serialized with a transaction-scoped advisory lock, so offsets become
//! visible in commit order and a reader polling `record_offset > committed`
//! never skips a record. Consumer positions are kept in
//! `bus_consumer_offsets`.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::upsert::excluded;
use std::collections::VecDeque;
use std::time::Duration;

use super::blocking_helpers::{RelayPgPool, run_blocking_with};
use super::models::{BusRecordRow, ConsumerOffsetRow, NewBusRecordRow};
use super::schema::{bus_consumer_offsets, bus_records};
use crate::relay::ports::{BusDelivery, BusError, BusReader, BusResult, MessageBus};

/// Default pause between polls when a topic has no new records.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default number of records fetched per poll.
pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Bus adapter storing topics as rows in `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PostgresMessageBus {
    pool: RelayPgPool,
    poll_interval: Duration,
    batch_size: i64,
}

impl PostgresMessageBus {
    /// Creates a bus over the given connection pool.
    #[must_use]
    pub const fn new(pool: RelayPgPool) -> Self {
        Self {
            pool,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the idle poll interval used by readers.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how many records a reader fetches per poll.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size;
        self
    }
}

#[async_trait]
impl MessageBus for PostgresMessageBus {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> BusResult<()> {
        let row = NewBusRecordRow {
            topic: topic.to_owned(),
            record_key: key.to_owned(),
            payload,
        };

        run_blocking_with(
            &self.pool,
            move |connection| {
                connection.transaction::<_, BusError, _>(|tx| {
                    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
                        .bind::<diesel::sql_types::Text, _>(&row.topic)
                        .execute(tx)
                        .map_err(BusError::transport)?;
                    diesel::insert_into(bus_records::table)
                        .values(&row)
                        .execute(tx)
                        .map_err(BusError::transport)?;
                    Ok(())
                })
            },
            BusError::Unavailable,
        )
        .await
    }

    async fn open_reader(&self, topic: &str, consumer: &str) -> BusResult<Box<dyn BusReader>> {
        let lookup_topic = topic.to_owned();
        let lookup_consumer = consumer.to_owned();

        let committed = run_blocking_with(
            &self.pool,
            move |connection| {
                bus_consumer_offsets::table
                    .filter(bus_consumer_offsets::consumer.eq(&lookup_consumer))
                    .filter(bus_consumer_offsets::topic.eq(&lookup_topic))
                    .select(bus_consumer_offsets::committed_offset)
                    .first::<i64>(connection)
                    .optional()
                    .map_err(BusError::transport)
            },
            BusError::Unavailable,
        )
        .await?
        .unwrap_or(0);

        Ok(Box::new(PostgresBusReader {
            pool: self.pool.clone(),
            topic: topic.to_owned(),
            consumer: consumer.to_owned(),
            committed,
            delivered: committed,
            buffered: VecDeque::new(),
            poll_interval: self.poll_interval,
            batch_size: self.batch_size,
        }))
    }
}

/// Polling reader over one `PostgreSQL` topic.
#[derive(Debug)]
pub struct PostgresBusReader {
    pool: RelayPgPool,
    topic: String,
    consumer: String,
    committed: i64,
    delivered: i64,
    buffered: VecDeque<BusDelivery>,
    poll_interval: Duration,
    batch_size: i64,
}

impl PostgresBusReader {
    async fn commit(&mut self) -> BusResult<()> {
        if self.delivered <= self.committed {
            return Ok(());
        }

        let row = ConsumerOffsetRow {
            consumer: self.consumer.clone(),
            topic: self.topic.clone(),
            committed_offset: self.delivered,
            updated_at: Utc::now(),
        };
        run_blocking_with(
            &self.pool,
            move |connection| {
                diesel::insert_into(bus_consumer_offsets::table)
                    .values(&row)
                    .on_conflict((bus_consumer_offsets::consumer, bus_consumer_offsets::topic))
                    .do_update()
                    .set((
                        bus_consumer_offsets::committed_offset
                            .eq(excluded(bus_consumer_offsets::committed_offset)),
                        bus_consumer_offsets::updated_at
                            .eq(excluded(bus_consumer_offsets::updated_at)),
                    ))
                    .execute(connection)
                    .map_err(BusError::transport)
            },
            BusError::Unavailable,
        )
        .await?;

        self.committed = self.delivered;
        Ok(())
    }

    async fn fetch_batch(&self) -> BusResult<Vec<BusDelivery>> {
        let topic = self.topic.clone();
        let after = self.delivered;
        let limit = self.batch_size;

        let rows = run_blocking_with(
            &self.pool,
            move |connection| {
                bus_records::table
                    .filter(bus_records::topic.eq(&topic))
                    .filter(bus_records::record_offset.gt(after))
                    .order(bus_records::record_offset.asc())
                    .limit(limit)
                    .select(BusRecordRow::as_select())
                    .load::<BusRecordRow>(connection)
                    .map_err(BusError::transport)
            },
            BusError::Unavailable,
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BusDelivery {
                offset: row.record_offset,
                key: row.record_key,
                payload: row.payload,
            })
            .collect())
    }
}

#[async_trait]
impl BusReader for PostgresBusReader {
    async fn next_delivery(&mut self) -> BusResult<Option<BusDelivery>> {
        self.commit().await?;

        loop {
            if let Some(delivery) = self.buffered.pop_front() {
                self.delivered = delivery.offset;
                return Ok(Some(delivery));
            }

            let batch = self.fetch_batch().await?;
            if batch.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            tracing::debug!(
                topic = %self.topic,
                consumer = %self.consumer,
                records = batch.len(),
                "bus batch fetched"
            );
            self.buffered.extend(batch);
        }
    }
}
