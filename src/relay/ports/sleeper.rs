//! Delay port used by the publish retry loop.

use async_trait::async_trait;
use std::time::Duration;

/// Waits for a duration.
///
/// Injected into [`crate::relay::services::BusClient`] so retry backoff can
/// be exercised without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleeps for `duration`.
    async fn sleep(&self, duration: Duration);
}
