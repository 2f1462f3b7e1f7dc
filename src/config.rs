//! Process configuration for `relayd`.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it; a `.env` file in the working directory is honoured.

use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::relay::services::{
    BusTopics, DEFAULT_CONSUMER, DEFAULT_DLQ_TOPIC, DEFAULT_MAX_CONTENT_LEN, DEFAULT_TOPIC,
    RetryPolicy,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Runtime configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "relayd", about = "Chat message relay")]
pub struct RelayConfig {
    /// `PostgreSQL` connection URL; in-memory adapters are used when unset.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "DATABASE_POOL_SIZE", default_value_t = 10)]
    pub database_pool_size: u32,

    /// HTTP listen port.
    #[arg(long, env = "API_PORT", default_value_t = 8080)]
    pub api_port: u16,

    /// Topic carrying chat messages.
    #[arg(long, env = "BUS_TOPIC", default_value = DEFAULT_TOPIC)]
    pub bus_topic: String,

    /// Topic carrying dead-letter entries.
    #[arg(long, env = "BUS_DLQ_TOPIC", default_value = DEFAULT_DLQ_TOPIC)]
    pub bus_dlq_topic: String,

    /// Durable consumer name for the relay loop.
    #[arg(long, env = "BUS_CONSUMER", default_value = DEFAULT_CONSUMER)]
    pub bus_consumer: String,

    /// Interval between polls of the database-backed bus.
    #[arg(long, env = "BUS_POLL_INTERVAL", default_value = "250ms", value_parser = humantime::parse_duration)]
    pub bus_poll_interval: Duration,

    /// Maximum message content length, in UTF-8 bytes.
    #[arg(long, env = "MESSAGE_MAX_LENGTH", default_value_t = DEFAULT_MAX_CONTENT_LEN)]
    pub message_max_length: usize,

    /// Accepted bearer tokens, comma separated.
    #[arg(long, env = "AUTH_TOKENS", value_delimiter = ',')]
    pub auth_tokens: Vec<String>,

    /// Maximum publish attempts per message.
    #[arg(long, env = "PUBLISH_MAX_ATTEMPTS", default_value_t = 5)]
    pub publish_max_attempts: u32,

    /// Deadline for a single publish attempt.
    #[arg(long, env = "PUBLISH_ATTEMPT_TIMEOUT", default_value = "3s", value_parser = humantime::parse_duration)]
    pub publish_attempt_timeout: Duration,

    /// Base of the quadratic publish backoff.
    #[arg(long, env = "PUBLISH_BASE_DELAY", default_value = "50ms", value_parser = humantime::parse_duration)]
    pub publish_base_delay: Duration,

    /// Upper bound for one publish backoff delay.
    #[arg(long, env = "PUBLISH_MAX_DELAY", default_value = "2s", value_parser = humantime::parse_duration)]
    pub publish_max_delay: Duration,

    /// Deadline for the single dead-letter publish.
    #[arg(long, env = "DEAD_LETTER_TIMEOUT", default_value = "2s", value_parser = humantime::parse_duration)]
    pub dead_letter_timeout: Duration,

    /// Deadline for one write to a live subscriber.
    #[arg(long, env = "BROADCAST_WRITE_TIMEOUT", default_value = "5s", value_parser = humantime::parse_duration)]
    pub broadcast_write_timeout: Duration,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads `.env` when present, then parses flags and environment.
    #[must_use]
    pub fn load() -> Self {
        // A missing .env file is the normal case.
        dotenvy::dotenv().ok();
        Self::parse()
    }

    /// Returns the publish retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.publish_max_attempts,
            attempt_timeout: self.publish_attempt_timeout,
            base_delay: self.publish_base_delay,
            max_delay: self.publish_max_delay,
            dead_letter_timeout: self.dead_letter_timeout,
        }
    }

    /// Returns topic and consumer names.
    #[must_use]
    pub fn bus_topics(&self) -> BusTopics {
        BusTopics {
            messages: self.bus_topic.clone(),
            dead_letters: self.bus_dlq_topic.clone(),
            consumer: self.bus_consumer.clone(),
        }
    }
}
