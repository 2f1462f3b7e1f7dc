//! Port trait definitions for the relay pipeline.
//!
//! Ports define the abstract interfaces the services require from
//! infrastructure. Adapters implement them to connect the pipeline to a
//! message bus, a database, live sockets and the surrounding collaborators.

pub mod auth;
pub mod bus;
pub mod connection;
pub mod metrics;
pub mod sleeper;
pub mod store;
pub mod validator;

pub use auth::{AuthError, TokenVerifier};
pub use bus::{BusDelivery, BusError, BusReader, BusResult, MessageBus};
pub use connection::{ConnectionError, OutboundFrame, SubscriberConnection};
pub use metrics::RelayMetrics;
pub use sleeper::Sleeper;
pub use store::{MessageStore, StoreError, StoreResult, UpsertOutcome};
pub use validator::SchemaValidator;
