//! Relay loop: consumes the bus, broadcasts and persists each message.

use mockable::Clock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::relay::{
    domain::{ChatMessage, PERSIST_FAILURE},
    ports::{BusError, MessageBus, MessageStore, RelayMetrics, UpsertOutcome},
    services::{BusClient, Hub},
};

/// Why [`RelayLoop::run`] returned.
#[derive(Debug, Clone)]
pub enum RelayExit {
    /// The cancellation token fired.
    Cancelled,
    /// The bus stream ended without cancellation.
    Exhausted,
    /// The bus reported an unrecoverable read or open failure.
    ReadFailed(BusError),
}

impl RelayExit {
    /// Returns `true` for a cancellation-driven exit.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Messages taken from the bus and broadcast.
    pub relayed: u64,
    /// Messages newly written to the store.
    pub stored: u64,
    /// Redeliveries the store already held.
    pub duplicates: u64,
    /// Messages routed to the dead-letter topic.
    pub dead_lettered: u64,
    /// Dead-letter publishes that failed.
    pub dead_letter_failures: u64,
}

/// Outcome of one [`RelayLoop::run`].
#[derive(Debug, Clone)]
pub struct RelayReport {
    /// Why the loop stopped.
    pub exit: RelayExit,
    /// Counters accumulated before stopping.
    pub stats: RelayStats,
}

/// Moves messages from the bus to live subscribers and the store.
///
/// Each message is broadcast before it is persisted, so subscribers see it
/// even when the store is down. A persistence failure routes the message to
/// the dead-letter topic with reason [`PERSIST_FAILURE`]; the loop then moves
/// on. Redeliveries are absorbed by the idempotent upsert, although
/// subscribers may see them twice.
pub struct RelayLoop<B, S, C>
where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    bus: Arc<BusClient<B, C>>,
    store: Arc<S>,
    hub: Arc<Hub>,
    metrics: Arc<dyn RelayMetrics>,
}

impl<B, S, C> RelayLoop<B, S, C>
where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    /// Creates a new relay loop.
    pub const fn new(
        bus: Arc<BusClient<B, C>>,
        store: Arc<S>,
        hub: Arc<Hub>,
        metrics: Arc<dyn RelayMetrics>,
    ) -> Self {
        Self {
            bus,
            store,
            hub,
            metrics,
        }
    }

    /// Runs until `cancel` fires or the bus stream ends.
    pub async fn run(&self, cancel: CancellationToken) -> RelayReport {
        let mut stats = RelayStats::default();
        let mut stream = match self.bus.consume(cancel.clone()).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(error = %err, "relay could not open bus reader");
                return RelayReport {
                    exit: RelayExit::ReadFailed(err),
                    stats,
                };
            }
        };
        tracing::info!(topic = %self.bus.topics().messages, "relay loop started");

        while let Some(item) = stream.next().await {
            match item {
                Ok(message) => self.relay(&message, &mut stats).await,
                Err(err) => {
                    tracing::error!(error = %err, "relay bus read failed");
                    return RelayReport {
                        exit: RelayExit::ReadFailed(err),
                        stats,
                    };
                }
            }
        }

        let exit = if cancel.is_cancelled() {
            RelayExit::Cancelled
        } else {
            RelayExit::Exhausted
        };
        tracing::info!(?exit, relayed = stats.relayed, "relay loop stopped");
        RelayReport { exit, stats }
    }

    async fn relay(&self, message: &ChatMessage, stats: &mut RelayStats) {
        self.hub.broadcast(message).await;
        stats.relayed = stats.relayed.saturating_add(1);

        match self.store.upsert(message).await {
            Ok(UpsertOutcome::Inserted) => stats.stored = stats.stored.saturating_add(1),
            Ok(UpsertOutcome::AlreadyPresent) => {
                tracing::debug!(message_id = %message.id(), "redelivered message already stored");
                stats.duplicates = stats.duplicates.saturating_add(1);
            }
            Err(err) => {
                tracing::warn!(
                    message_id = %message.id(),
                    error = %err,
                    "persisting relayed message failed; dead-lettering"
                );
                self.metrics.message_dead_lettered();
                // Shutdown must not drop a record that is neither stored nor
                // dead-lettered; the attempt is bounded by the dead-letter timeout.
                let attempt = CancellationToken::new();
                match self
                    .bus
                    .publish_dead_letter(message, PERSIST_FAILURE, &attempt)
                    .await
                {
                    Ok(()) => stats.dead_lettered = stats.dead_lettered.saturating_add(1),
                    Err(_) => {
                        stats.dead_letter_failures = stats.dead_letter_failures.saturating_add(1);
                    }
                }
            }
        }
    }
}
