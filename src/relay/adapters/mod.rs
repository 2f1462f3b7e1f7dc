//! Adapter implementations for the relay ports.
//!
//! # Available Adapters
//!
//! - [`memory`]: bus, store and connection doubles with failure injection
//! - [`postgres`]: Diesel-backed durable store and polling bus
//! - [`PrometheusRelayMetrics`] / [`NoopRelayMetrics`]: metrics sinks
//! - [`StaticTokenVerifier`]: configured-token verifier
//! - [`TokioSleeper`]: real-time backoff delays

pub mod memory;
pub mod postgres;

mod metrics;
mod runtime;
mod verifier;

pub use metrics::{NoopRelayMetrics, PrometheusRelayMetrics};
pub use runtime::TokioSleeper;
pub use verifier::StaticTokenVerifier;
