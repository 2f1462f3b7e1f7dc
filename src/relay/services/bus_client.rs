//! Retrying publisher and decoding consumer over a [`MessageBus`].
//!
//! The transport port makes single attempts only. This client owns the
//! policy on top: bounded publish attempts with per-attempt deadlines and
//! quadratic backoff, payload decoding on the consume side, and the
//! one-shot dead-letter publish.

use futures::Stream;
use mockable::Clock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::relay::{
    domain::{ChatMessage, DeadLetterEntry},
    ports::{BusError, BusReader, BusResult, MessageBus, Sleeper},
};

/// Default topic carrying chat messages.
pub const DEFAULT_TOPIC: &str = "chat-messages";

/// Default topic carrying dead-letter entries.
pub const DEFAULT_DLQ_TOPIC: &str = "chat-messages-dlq";

/// Default durable consumer name.
pub const DEFAULT_CONSUMER: &str = "chat-relay";

/// Bounded retry policy for publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of publish attempts; values below one are treated as one.
    pub max_attempts: u32,
    /// Deadline applied to each attempt.
    pub attempt_timeout: Duration,
    /// Base of the quadratic backoff.
    pub base_delay: Duration,
    /// Upper bound for any single backoff delay.
    pub max_delay: Duration,
    /// Deadline for the single dead-letter attempt.
    pub dead_letter_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(3),
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            dead_letter_timeout: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Returns the delay to wait after failed attempt number `attempt`
    /// (1-based): `base_delay * attempt²`, capped at `max_delay`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(attempt.saturating_mul(attempt))
            .min(self.max_delay)
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

/// Topic and consumer names used by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusTopics {
    /// Topic carrying chat messages.
    pub messages: String,
    /// Topic carrying dead-letter entries.
    pub dead_letters: String,
    /// Durable consumer name used when reading `messages`.
    pub consumer: String,
}

impl Default for BusTopics {
    fn default() -> Self {
        Self {
            messages: DEFAULT_TOPIC.to_owned(),
            dead_letters: DEFAULT_DLQ_TOPIC.to_owned(),
            consumer: DEFAULT_CONSUMER.to_owned(),
        }
    }
}

/// Why a publish gave up.
#[derive(Debug, Clone)]
pub enum PublishFailure {
    /// Every attempt failed; carries the last transport error.
    Exhausted(BusError),
    /// The caller cancelled before an attempt succeeded.
    Cancelled,
    /// The message could not be encoded.
    Encoding(String),
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(err) => write!(f, "publish attempts exhausted: {err}"),
            Self::Cancelled => f.write_str("publish cancelled"),
            Self::Encoding(reason) => write!(f, "message encoding failed: {reason}"),
        }
    }
}

/// Result of [`BusClient::publish`].
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// The bus accepted the message.
    Published {
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// The message was not published.
    Failed {
        /// Attempts made before giving up.
        attempts: u32,
        /// Why publishing stopped.
        reason: PublishFailure,
    },
}

impl PublishOutcome {
    /// Returns `true` when the bus accepted the message.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }

    /// Returns the number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Published { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Publishes and consumes chat messages through a [`MessageBus`].
pub struct BusClient<B, C>
where
    B: MessageBus,
    C: Clock + Send + Sync,
{
    bus: Arc<B>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<C>,
    topics: BusTopics,
    policy: RetryPolicy,
}

impl<B, C> BusClient<B, C>
where
    B: MessageBus,
    C: Clock + Send + Sync,
{
    /// Creates a client with default topics and retry policy.
    pub fn new(bus: Arc<B>, sleeper: Arc<dyn Sleeper>, clock: Arc<C>) -> Self {
        Self {
            bus,
            sleeper,
            clock,
            topics: BusTopics::default(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the topic and consumer names.
    #[must_use]
    pub fn with_topics(mut self, topics: BusTopics) -> Self {
        self.topics = topics;
        self
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the configured topic names.
    pub const fn topics(&self) -> &BusTopics {
        &self.topics
    }

    /// Returns the retry policy.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Publishes `message` keyed by its identifier.
    ///
    /// Each attempt is bounded by the policy's attempt timeout. Between
    /// failed attempts the client waits `delay_after(attempt)`; no delay
    /// follows the final attempt. Cancellation is observed before every
    /// attempt and during both the attempt and the backoff wait.
    pub async fn publish(&self, message: &ChatMessage, cancel: &CancellationToken) -> PublishOutcome {
        let payload = match message.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                return PublishOutcome::Failed {
                    attempts: 0,
                    reason: PublishFailure::Encoding(err.to_string()),
                };
            }
        };

        let max_attempts = self.policy.attempts();
        let mut last_error = BusError::unavailable("no publish attempt made");
        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return cancelled(attempt.saturating_sub(1));
            }

            let send = self
                .bus
                .send(&self.topics.messages, message.id().as_str(), payload.clone());
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return cancelled(attempt),
                result = tokio::time::timeout(self.policy.attempt_timeout, send) => result,
            };

            let err = match result {
                Ok(Ok(())) => {
                    tracing::debug!(
                        message_id = %message.id(),
                        topic = %self.topics.messages,
                        attempt,
                        "message published"
                    );
                    return PublishOutcome::Published { attempts: attempt };
                }
                Ok(Err(err)) => err,
                Err(_) => BusError::Timeout(self.policy.attempt_timeout),
            };
            tracing::warn!(
                message_id = %message.id(),
                attempt,
                max_attempts,
                error = %err,
                "publish attempt failed"
            );
            last_error = err;

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return cancelled(attempt),
                    () = self.sleeper.sleep(self.policy.delay_after(attempt)) => {}
                }
            }
        }

        PublishOutcome::Failed {
            attempts: max_attempts,
            reason: PublishFailure::Exhausted(last_error),
        }
    }

    /// Publishes a dead-letter entry for `message` in a single attempt.
    ///
    /// # Errors
    ///
    /// Returns the [`BusError`] of the failed attempt; the failure is also
    /// logged here so callers may ignore it.
    pub async fn publish_dead_letter(
        &self,
        message: &ChatMessage,
        reason: &str,
        cancel: &CancellationToken,
    ) -> BusResult<()> {
        let result = self.send_dead_letter(message, reason, cancel).await;
        match &result {
            Ok(()) => tracing::info!(
                message_id = %message.id(),
                topic = %self.topics.dead_letters,
                reason,
                "message dead-lettered"
            ),
            Err(err) => tracing::error!(
                message_id = %message.id(),
                reason,
                error = %err,
                "dead-letter publish failed"
            ),
        }
        result
    }

    async fn send_dead_letter(
        &self,
        message: &ChatMessage,
        reason: &str,
        cancel: &CancellationToken,
    ) -> BusResult<()> {
        let entry = DeadLetterEntry::new(message.clone(), reason, &*self.clock);
        let payload = entry.to_json().map_err(BusError::transport)?;
        let send = self
            .bus
            .send(&self.topics.dead_letters, message.id().as_str(), payload);
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(BusError::unavailable("dead-letter publish cancelled")),
            result = tokio::time::timeout(self.policy.dead_letter_timeout, send) => {
                result.unwrap_or(Err(BusError::Timeout(self.policy.dead_letter_timeout)))
            }
        }
    }

    /// Opens a decoding stream over the message topic.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] when the reader cannot be opened.
    pub async fn consume(&self, cancel: CancellationToken) -> BusResult<MessageStream> {
        let open = self
            .bus
            .open_reader(&self.topics.messages, &self.topics.consumer);
        let reader = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            reader = open => Some(reader?),
        };
        Ok(MessageStream {
            reader,
            cancel,
            topic: self.topics.messages.clone(),
        })
    }
}

const fn cancelled(attempts: u32) -> PublishOutcome {
    PublishOutcome::Failed {
        attempts,
        reason: PublishFailure::Cancelled,
    }
}

/// Lazily decoded sequence of messages read from the bus.
///
/// Payloads that do not decode as a [`ChatMessage`] are logged and skipped.
/// The stream ends when its token is cancelled, when the topic is closed, or
/// after yielding a read error.
pub struct MessageStream {
    reader: Option<Box<dyn BusReader>>,
    cancel: CancellationToken,
    topic: String,
}

impl MessageStream {
    /// Waits for the next decoded message.
    pub async fn next(&mut self) -> Option<BusResult<ChatMessage>> {
        loop {
            let step = {
                let reader = self.reader.as_mut()?;
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => None,
                    delivery = reader.next_delivery() => Some(delivery),
                }
            };

            match step {
                Some(Ok(Some(delivery))) => match ChatMessage::from_json(&delivery.payload) {
                    Ok(message) => return Some(Ok(message)),
                    Err(err) => {
                        tracing::warn!(
                            topic = %self.topic,
                            offset = delivery.offset,
                            key = %delivery.key,
                            error = %err,
                            "skipping undecodable bus payload"
                        );
                    }
                },
                Some(Err(err)) => {
                    self.reader = None;
                    return Some(Err(err));
                }
                Some(Ok(None)) | None => {
                    self.reader = None;
                    return None;
                }
            }
        }
    }

    /// Returns `true` once the stream can yield nothing further.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.reader.is_none()
    }

    /// Converts into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = BusResult<ChatMessage>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next().await?;
            Some((item, stream))
        })
    }
}
