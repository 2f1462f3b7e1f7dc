//! Subscriber registry with fan-out broadcast.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::relay::{
    domain::{ChatMessage, ConnectionId},
    ports::{ConnectionError, OutboundFrame, RelayMetrics, SubscriberConnection},
};

/// Default bound on a single subscriber write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one broadcast call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that accepted the frame.
    pub delivered: usize,
    /// Connections whose write failed; each was removed and closed.
    pub dropped: Vec<ConnectionId>,
}

/// Registry of live subscriber connections.
///
/// Membership sits behind a reader/writer lock. A broadcast copies the
/// membership under the shared lock and releases it before writing, so
/// registration and removal never wait on a subscriber's socket. Every
/// write is bounded by the hub's write timeout and writes run concurrently.
///
/// A connection is closed exactly once: only the call that takes it out of
/// the map closes it.
pub struct Hub {
    connections: RwLock<HashMap<ConnectionId, Arc<dyn SubscriberConnection>>>,
    write_timeout: Duration,
    metrics: Arc<dyn RelayMetrics>,
}

impl Hub {
    /// Creates an empty hub reporting to `metrics`.
    #[must_use]
    pub fn new(metrics: Arc<dyn RelayMetrics>) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            metrics,
        }
    }

    /// Sets the per-subscriber write timeout.
    #[must_use]
    pub const fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Returns the per-subscriber write timeout.
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Registers a connection.
    ///
    /// Returns `false` when a connection with the same identifier is already
    /// registered; the existing handle is kept.
    pub async fn add(&self, connection: Arc<dyn SubscriberConnection>) -> bool {
        let id = connection.id();
        let mut connections = self.connections.write().await;
        if connections.contains_key(&id) {
            return false;
        }
        connections.insert(id, connection);
        let live = connections.len();
        drop(connections);

        self.metrics.set_live_subscribers(live);
        tracing::info!(connection_id = %id, live, "subscriber connected");
        true
    }

    /// Unregisters and closes a connection.
    ///
    /// Returns `false` (and closes nothing) when the connection is not
    /// registered, so repeated calls are harmless.
    pub async fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let Some(connection) = connections.remove(&id) else {
            return false;
        };
        let live = connections.len();
        drop(connections);

        connection.close().await;
        self.metrics.set_live_subscribers(live);
        tracing::info!(connection_id = %id, live, "subscriber disconnected");
        true
    }

    /// Returns the number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` when no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Returns `true` when `id` is registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Sends `message` to every registered connection.
    pub async fn broadcast(&self, message: &ChatMessage) -> BroadcastReport {
        self.deliver(message, None).await
    }

    /// Sends `message` to every registered connection except `origin`.
    pub async fn broadcast_except(
        &self,
        message: &ChatMessage,
        origin: ConnectionId,
    ) -> BroadcastReport {
        self.deliver(message, Some(origin)).await
    }

    async fn deliver(&self, message: &ChatMessage, skip: Option<ConnectionId>) -> BroadcastReport {
        let targets: Vec<Arc<dyn SubscriberConnection>> = self
            .connections
            .read()
            .await
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .map(|(_, connection)| Arc::clone(connection))
            .collect();

        let frame = OutboundFrame::Message(message.clone());
        let results = join_all(targets.iter().map(|connection| self.write(connection, &frame))).await;

        let mut report = BroadcastReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(err) => {
                    tracing::warn!(
                        connection_id = %id,
                        message_id = %message.id(),
                        error = %err,
                        "subscriber write failed; dropping connection"
                    );
                    report.dropped.push(id);
                }
            }
        }

        for id in &report.dropped {
            self.remove(*id).await;
        }

        self.metrics.message_broadcast();
        tracing::debug!(
            message_id = %message.id(),
            delivered = report.delivered,
            dropped = report.dropped.len(),
            "message broadcast"
        );
        report
    }

    async fn write(
        &self,
        connection: &Arc<dyn SubscriberConnection>,
        frame: &OutboundFrame,
    ) -> (ConnectionId, Result<(), ConnectionError>) {
        let id = connection.id();
        let result = tokio::time::timeout(self.write_timeout, connection.send(frame))
            .await
            .unwrap_or(Err(ConnectionError::Timeout(id)));
        (id, result)
    }
}
