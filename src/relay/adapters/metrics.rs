//! Metrics sink adapters.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::relay::ports::RelayMetrics;

/// Metrics sink that discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRelayMetrics;

impl RelayMetrics for NoopRelayMetrics {
    fn message_ingested(&self) {}

    fn message_broadcast(&self) {}

    fn message_dead_lettered(&self) {}

    fn set_live_subscribers(&self, _count: usize) {}
}

/// Prometheus-backed metrics sink with its own registry.
#[derive(Debug, Clone)]
pub struct PrometheusRelayMetrics {
    registry: Registry,
    ingested: IntCounter,
    broadcast: IntCounter,
    dead_lettered: IntCounter,
    live_subscribers: IntGauge,
}

impl PrometheusRelayMetrics {
    /// Creates the sink and registers its collectors.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if a collector cannot be registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let ingested = IntCounter::new(
            "chatapp_messages_ingested_total",
            "Messages accepted at ingestion",
        )?;
        let broadcast = IntCounter::new(
            "chatapp_messages_broadcast_total",
            "Messages broadcast to live subscribers",
        )?;
        let dead_lettered = IntCounter::new(
            "chatapp_messages_dead_lettered_total",
            "Messages routed to the dead-letter topic after a persistence failure",
        )?;
        let live_subscribers = IntGauge::new(
            "chatapp_websocket_connections",
            "Live subscriber connections",
        )?;

        registry.register(Box::new(ingested.clone()))?;
        registry.register(Box::new(broadcast.clone()))?;
        registry.register(Box::new(dead_lettered.clone()))?;
        registry.register(Box::new(live_subscribers.clone()))?;

        Ok(Self {
            registry,
            ingested,
            broadcast,
            dead_lettered,
            live_subscribers,
        })
    }

    /// Renders the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

impl RelayMetrics for PrometheusRelayMetrics {
    fn message_ingested(&self) {
        self.ingested.inc();
    }

    fn message_broadcast(&self) {
        self.broadcast.inc();
    }

    fn message_dead_lettered(&self) {
        self.dead_lettered.inc();
    }

    fn set_live_subscribers(&self, count: usize) {
        self.live_subscribers
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
