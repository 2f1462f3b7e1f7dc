//! Domain types for the relay pipeline.
//!
//! Pure value types with no infrastructure dependencies, serialisable via
//! serde so they can cross the bus and the socket boundary unchanged.

mod dead_letter;
mod delivery;
mod ids;
mod message;

pub use dead_letter::{DeadLetterEntry, PERSIST_FAILURE};
pub use delivery::{IngestAck, IngestStatus, IngressOrigin};
pub use ids::{ConnectionId, MessageId};
pub use message::{ChatMessage, InboundMessage};
