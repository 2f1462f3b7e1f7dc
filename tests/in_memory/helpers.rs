//! Shared fixtures for in-memory relay integration tests.

use async_trait::async_trait;
use chat_relay::relay::{
    adapters::{
        NoopRelayMetrics,
        memory::{ChannelConnection, InMemoryMessageBus, InMemoryMessageStore},
    },
    domain::ChatMessage,
    ports::{OutboundFrame, RelayMetrics, Sleeper, SubscriberConnection},
    services::{BusClient, Hub, IngressService, RelayLoop},
    validation::DefaultSchemaValidator,
};
use mockable::DefaultClock;
use rstest::fixture;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// Upper bound on how long a test waits for an asynchronous effect.
pub const SETTLE: Duration = Duration::from_secs(2);

/// Ingress service wired to the in-memory adapters.
pub type MemoryIngress = IngressService<InMemoryMessageBus, InMemoryMessageStore, DefaultClock>;

/// Relay loop wired to the in-memory adapters.
pub type MemoryRelayLoop = RelayLoop<InMemoryMessageBus, InMemoryMessageStore, DefaultClock>;

/// Backoff that never waits.
#[derive(Debug, Default)]
pub struct NoDelay;

#[async_trait]
impl Sleeper for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// A complete relay over in-memory adapters.
pub struct Relay {
    /// Shared bus with failure injection.
    pub bus: Arc<InMemoryMessageBus>,
    /// Shared store with failure injection.
    pub store: Arc<InMemoryMessageStore>,
    /// Live subscriber registry.
    pub hub: Arc<Hub>,
    /// Ingestion entrypoint.
    pub ingress: Arc<MemoryIngress>,
    /// Consumer side of the pipeline.
    pub relay: Arc<MemoryRelayLoop>,
}

impl Relay {
    /// Registers a new live subscriber and returns its frame receiver.
    pub async fn subscribe(
        &self,
    ) -> (Arc<ChannelConnection>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (connection, frames) = ChannelConnection::pair();
        let connection = Arc::new(connection);
        self.hub
            .add(Arc::clone(&connection) as Arc<dyn SubscriberConnection>)
            .await;
        (connection, frames)
    }
}

/// Provides a tokio runtime for async operations in tests.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
#[fixture]
pub fn runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
}

/// Provides a freshly wired relay for each test.
#[fixture]
pub fn relay() -> Relay {
    let bus = Arc::new(InMemoryMessageBus::new());
    let store = Arc::new(InMemoryMessageStore::new());
    let metrics = Arc::new(NoopRelayMetrics) as Arc<dyn RelayMetrics>;
    let clock = Arc::new(DefaultClock);
    let hub = Arc::new(Hub::new(Arc::clone(&metrics)).with_write_timeout(Duration::from_millis(200)));
    let client = Arc::new(BusClient::new(
        Arc::clone(&bus),
        Arc::new(NoDelay) as Arc<dyn Sleeper>,
        Arc::clone(&clock),
    ));
    let ingress = Arc::new(IngressService::new(
        Arc::clone(&client),
        Arc::clone(&store),
        Arc::clone(&hub),
        Arc::new(DefaultSchemaValidator::new()),
        Arc::clone(&metrics),
        clock,
    ));
    let relay = Arc::new(RelayLoop::new(
        client,
        Arc::clone(&store),
        Arc::clone(&hub),
        metrics,
    ));

    Relay {
        bus,
        store,
        hub,
        ingress,
        relay,
    }
}

/// Waits for the next relayed chat message, skipping acks and rejections.
pub async fn next_message(frames: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Option<ChatMessage> {
    tokio::time::timeout(SETTLE, async {
        while let Some(frame) = frames.recv().await {
            if let OutboundFrame::Message(message) = frame {
                return Some(message);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Polls the store until it holds `expected` records or [`SETTLE`] elapses.
pub async fn wait_for_stored(store: &InMemoryMessageStore, expected: usize) -> bool {
    let deadline = tokio::time::Instant::now() + SETTLE;
    while tokio::time::Instant::now() < deadline {
        if store.len().is_ok_and(|len| len >= expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
