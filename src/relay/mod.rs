//! Chat message relay pipeline.
//!
//! Messages enter through an ingress path, are published to a message bus,
//! and a relay loop consumes them back to broadcast to live subscribers and
//! persist them durably. When the bus is unreachable, ingress delivers the
//! message directly instead.
//!
//! # Architecture
//!
//! The module follows hexagonal architecture principles:
//!
//! - **Domain**: Value types ([`domain::ChatMessage`], [`domain::InboundMessage`],
//!   [`domain::DeadLetterEntry`], identifiers and acknowledgements)
//! - **Ports**: Abstract interfaces ([`ports::MessageBus`], [`ports::MessageStore`],
//!   [`ports::SubscriberConnection`], [`ports::TokenVerifier`] and friends)
//! - **Adapters**: In-memory doubles, Postgres-backed store and bus, metrics
//!   sinks and a static token verifier
//! - **Services**: [`services::Hub`], [`services::BusClient`],
//!   [`services::IngressService`] and [`services::RelayLoop`]
//! - **Validation**: Schema rules applied at ingestion
//!
//! # Example
//!
//! ```
//! use chat_relay::relay::domain::{ChatMessage, InboundMessage};
//! use chat_relay::relay::ports::SchemaValidator;
//! use chat_relay::relay::validation::DefaultSchemaValidator;
//! use mockable::DefaultClock;
//!
//! let message = ChatMessage::normalize(InboundMessage::new("alice", "hello"), &DefaultClock);
//! DefaultSchemaValidator::new()
//!     .validate(&message)
//!     .expect("valid message");
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod validation;

#[cfg(test)]
mod tests;
