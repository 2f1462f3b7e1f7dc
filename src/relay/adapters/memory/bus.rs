//! In-memory message bus for tests and single-process development.
//!
//! Topics are append-only vectors; consumer positions are kept per
//! `(consumer, topic)` pair so a reopened reader resumes where the previous
//! one stopped, mirroring a durable bus.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;

use crate::relay::ports::{BusDelivery, BusError, BusReader, BusResult, MessageBus};

/// Thread-safe in-memory bus with failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageBus {
    inner: Arc<BusInner>,
}

#[derive(Debug, Default)]
struct BusInner {
    state: RwLock<InMemoryBusState>,
    appended: Notify,
}

#[derive(Debug, Default)]
struct InMemoryBusState {
    topics: HashMap<String, Vec<StoredRecord>>,
    positions: HashMap<(String, String), usize>,
    unavailable: Option<String>,
    failing_sends: usize,
    send_attempts: usize,
    closed: bool,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    key: String,
    payload: Vec<u8>,
}

fn lock_error(err: impl std::fmt::Display) -> BusError {
    BusError::unavailable(format!("bus state lock poisoned: {err}"))
}

impl InMemoryMessageBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail until [`Self::restore`] is called.
    ///
    /// # Errors
    ///
    /// Returns bus errors when lock acquisition fails.
    pub fn set_unavailable(&self, reason: impl Into<String>) -> BusResult<()> {
        let mut state = self.inner.state.write().map_err(lock_error)?;
        state.unavailable = Some(reason.into());
        Ok(())
    }

    /// Fails the next `count` sends, then behaves normally.
    ///
    /// # Errors
    ///
    /// Returns bus errors when lock acquisition fails.
    pub fn fail_next_sends(&self, count: usize) -> BusResult<()> {
        let mut state = self.inner.state.write().map_err(lock_error)?;
        state.failing_sends = count;
        Ok(())
    }

    /// Clears injected failures.
    ///
    /// # Errors
    ///
    /// Returns bus errors when lock acquisition fails.
    pub fn restore(&self) -> BusResult<()> {
        let mut state = self.inner.state.write().map_err(lock_error)?;
        state.unavailable = None;
        state.failing_sends = 0;
        Ok(())
    }

    /// Closes every topic; readers drain what remains and then end.
    ///
    /// # Errors
    ///
    /// Returns bus errors when lock acquisition fails.
    pub fn close(&self) -> BusResult<()> {
        let mut state = self.inner.state.write().map_err(lock_error)?;
        state.closed = true;
        drop(state);
        self.inner.appended.notify_waiters();
        Ok(())
    }

    /// Returns every record published to `topic`, in order.
    ///
    /// # Errors
    ///
    /// Returns bus errors when lock acquisition fails.
    pub fn records(&self, topic: &str) -> BusResult<Vec<BusDelivery>> {
        let state = self.inner.state.read().map_err(lock_error)?;
        let records = state
            .topics
            .get(topic)
            .map(|records| {
                records
                    .iter()
                    .enumerate()
                    .map(|(index, record)| delivery_at(index, record))
                    .collect::<BusResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(records)
    }

    /// Returns how many sends have been attempted, successful or not.
    ///
    /// # Errors
    ///
    /// Returns bus errors when lock acquisition fails.
    pub fn send_attempts(&self) -> BusResult<usize> {
        let state = self.inner.state.read().map_err(lock_error)?;
        Ok(state.send_attempts)
    }
}

fn delivery_at(index: usize, record: &StoredRecord) -> BusResult<BusDelivery> {
    let offset = i64::try_from(index).map_err(BusError::transport)?;
    Ok(BusDelivery {
        offset,
        key: record.key.clone(),
        payload: record.payload.clone(),
    })
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn send(&self, topic: &str, key: &str, payload: Vec<u8>) -> BusResult<()> {
        let mut state = self.inner.state.write().map_err(lock_error)?;
        state.send_attempts = state.send_attempts.saturating_add(1);

        if let Some(reason) = &state.unavailable {
            return Err(BusError::unavailable(reason.clone()));
        }
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(BusError::unavailable("injected send failure"));
        }
        if state.closed {
            return Err(BusError::Closed(topic.to_owned()));
        }

        state
            .topics
            .entry(topic.to_owned())
            .or_default()
            .push(StoredRecord {
                key: key.to_owned(),
                payload,
            });
        drop(state);
        self.inner.appended.notify_waiters();
        Ok(())
    }

    async fn open_reader(&self, topic: &str, consumer: &str) -> BusResult<Box<dyn BusReader>> {
        let state = self.inner.state.read().map_err(lock_error)?;
        let position = state
            .positions
            .get(&(consumer.to_owned(), topic.to_owned()))
            .copied()
            .unwrap_or(0);

        Ok(Box::new(InMemoryBusReader {
            inner: Arc::clone(&self.inner),
            topic: topic.to_owned(),
            consumer: consumer.to_owned(),
            position,
        }))
    }
}

/// Reader over one in-memory topic.
#[derive(Debug)]
pub struct InMemoryBusReader {
    inner: Arc<BusInner>,
    topic: String,
    consumer: String,
    position: usize,
}

impl InMemoryBusReader {
    fn commit(&self) -> BusResult<()> {
        let mut state = self.inner.state.write().map_err(lock_error)?;
        state
            .positions
            .insert((self.consumer.clone(), self.topic.clone()), self.position);
        Ok(())
    }
}

#[async_trait]
impl BusReader for InMemoryBusReader {
    async fn next_delivery(&mut self) -> BusResult<Option<BusDelivery>> {
        self.commit()?;

        loop {
            // Register interest before inspecting state so an append between
            // the check and the await is not missed.
            let appended = self.inner.appended.notified();
            {
                let state = self.inner.state.read().map_err(lock_error)?;
                let next = state
                    .topics
                    .get(&self.topic)
                    .and_then(|records| records.get(self.position));
                if let Some(record) = next {
                    let delivery = delivery_at(self.position, record)?;
                    self.position = self.position.saturating_add(1);
                    return Ok(Some(delivery));
                }
                if state.closed {
                    return Ok(None);
                }
            }
            appended.await;
        }
    }
}
