//! Metrics sink port.

/// Fire-and-forget counters reported by the pipeline.
///
/// The pipeline never reads these values back.
pub trait RelayMetrics: Send + Sync {
    /// A message was accepted at ingestion (either delivery path).
    fn message_ingested(&self);

    /// A message was broadcast to the hub.
    fn message_broadcast(&self);

    /// A message was handed to the dead-letter path.
    fn message_dead_lettered(&self);

    /// Reports the current number of live subscribers.
    fn set_live_subscribers(&self, count: usize);
}
