//! In-memory adapter implementations.
//!
//! Simple, thread-safe implementations with failure injection, suitable for
//! unit and integration testing without a database or network.

mod bus;
mod connection;
mod store;

pub use bus::{InMemoryBusReader, InMemoryMessageBus};
pub use connection::ChannelConnection;
pub use store::InMemoryMessageStore;
