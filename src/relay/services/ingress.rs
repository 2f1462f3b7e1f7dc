//! Ingress service: normalizes, validates and enqueues inbound messages.

use mockable::Clock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::relay::{
    domain::{ChatMessage, IngestAck, IngestStatus, InboundMessage, IngressOrigin},
    error::ValidationError,
    ports::{MessageBus, MessageStore, RelayMetrics, SchemaValidator, StoreResult},
    services::{BusClient, Hub, PublishOutcome},
    validation::rules,
};

/// Default maximum content length, in characters.
pub const DEFAULT_MAX_CONTENT_LEN: usize = 1000;

/// Handles messages arriving through either ingress path.
///
/// A valid message is published to the bus. When publishing gives up, the
/// message is delivered directly instead: broadcast to the hub (skipping the
/// sending connection, if any) and upserted into the store. The caller is
/// told which path was taken through [`IngestStatus`].
pub struct IngressService<B, S, C>
where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    bus: Arc<BusClient<B, C>>,
    store: Arc<S>,
    hub: Arc<Hub>,
    validator: Arc<dyn SchemaValidator>,
    metrics: Arc<dyn RelayMetrics>,
    clock: Arc<C>,
    max_content_len: usize,
}

impl<B, S, C> IngressService<B, S, C>
where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    /// Creates a new ingress service.
    pub fn new(
        bus: Arc<BusClient<B, C>>,
        store: Arc<S>,
        hub: Arc<Hub>,
        validator: Arc<dyn SchemaValidator>,
        metrics: Arc<dyn RelayMetrics>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            bus,
            store,
            hub,
            validator,
            metrics,
            clock,
            max_content_len: DEFAULT_MAX_CONTENT_LEN,
        }
    }

    /// Sets the maximum content length, in characters.
    #[must_use]
    pub const fn with_max_content_len(mut self, max_content_len: usize) -> Self {
        self.max_content_len = max_content_len;
        self
    }

    /// Decodes a raw payload and ingests it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the payload is not a message object
    /// or the normalized message fails validation.
    pub async fn ingest(
        &self,
        payload: &[u8],
        origin: IngressOrigin,
        cancel: &CancellationToken,
    ) -> Result<IngestAck, ValidationError> {
        let inbound = InboundMessage::from_json(payload)?;
        self.ingest_message(inbound, origin, cancel).await
    }

    /// Ingests an already decoded message.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the normalized message fails
    /// validation. Nothing is published or delivered in that case.
    pub async fn ingest_message(
        &self,
        inbound: InboundMessage,
        origin: IngressOrigin,
        cancel: &CancellationToken,
    ) -> Result<IngestAck, ValidationError> {
        let message = ChatMessage::normalize(inbound, &*self.clock);
        rules::validate_content_length(&message, self.max_content_len)?;
        self.validator.validate(&message)?;

        let status = match self.bus.publish(&message, cancel).await {
            PublishOutcome::Published { .. } => IngestStatus::Enqueued,
            PublishOutcome::Failed { attempts, reason } => {
                tracing::warn!(
                    message_id = %message.id(),
                    attempts,
                    reason = %reason,
                    "bus publish gave up; delivering directly"
                );
                self.deliver_directly(&message, origin).await;
                IngestStatus::BroadcastedFallback
            }
        };

        self.metrics.message_ingested();
        tracing::info!(
            message_id = %message.id(),
            author = %message.author(),
            status = %status,
            "message ingested"
        );
        Ok(IngestAck {
            id: message.id().clone(),
            status,
        })
    }

    async fn deliver_directly(&self, message: &ChatMessage, origin: IngressOrigin) {
        match origin.connection() {
            Some(sender) => self.hub.broadcast_except(message, sender).await,
            None => self.hub.broadcast(message).await,
        };

        if let Err(err) = self.store.upsert(message).await {
            tracing::error!(
                message_id = %message.id(),
                error = %err,
                "direct delivery could not persist message"
            );
        }
    }

    /// Returns the stored history ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns the store's error when history cannot be read.
    pub async fn history(&self) -> StoreResult<Vec<ChatMessage>> {
        self.store.read_all().await
    }

    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns the store's error when it cannot be reached.
    pub async fn ready(&self) -> StoreResult<()> {
        self.store.ping().await
    }
}
