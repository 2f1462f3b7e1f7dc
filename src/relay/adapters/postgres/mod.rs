//! `PostgreSQL` adapters for the relay pipeline using Diesel ORM.
//!
//! Both adapters share one r2d2 pool and offload every query to the
//! blocking thread pool. The schema lives in `migrations/`.

mod blocking_helpers;
mod bus;
mod models;
mod schema;
mod store;

pub use blocking_helpers::{RelayPgPool, build_pool};
pub use bus::{DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL, PostgresBusReader, PostgresMessageBus};
pub use store::PostgresMessageStore;
