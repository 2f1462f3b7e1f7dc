//! Chat relay: durable, bus-backed fan-out of chat messages.
//!
//! Messages arrive over HTTP or a live WebSocket, are published to a message
//! bus, and a single relay loop consumes them, broadcasts each one to every
//! connected subscriber, and upserts it into a durable store. When the bus
//! is unavailable, ingress delivers and stores the message directly.
//!
//! # Architecture
//!
//! The relay follows hexagonal architecture principles:
//!
//! - **Domain**: message types and validation with no infrastructure
//! - **Ports**: trait interfaces for the bus, store, subscribers and auth
//! - **Adapters**: in-memory, `PostgreSQL`, Prometheus and runtime
//!   implementations of the ports
//! - **Services**: hub, bus client, ingress and relay loop
//!
//! # Modules
//!
//! - [`relay`]: the pipeline itself
//! - [`server`]: `axum` routes over the pipeline
//! - [`config`]: command-line and environment configuration
//! - [`telemetry`]: tracing subscriber setup

pub mod config;
pub mod relay;
pub mod server;
pub mod telemetry;
