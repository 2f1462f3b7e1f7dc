//! Service layer orchestrating the relay pipeline over its ports.

mod bus_client;
mod hub;
mod ingress;
mod relay_loop;

pub use bus_client::{
    BusClient, BusTopics, DEFAULT_CONSUMER, DEFAULT_DLQ_TOPIC, DEFAULT_TOPIC, MessageStream,
    PublishFailure, PublishOutcome, RetryPolicy,
};
pub use hub::{BroadcastReport, DEFAULT_WRITE_TIMEOUT, Hub};
pub use ingress::{DEFAULT_MAX_CONTENT_LEN, IngressService};
pub use relay_loop::{RelayExit, RelayLoop, RelayReport, RelayStats};
