//! Channel-backed subscriber connection for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::relay::{
    domain::ConnectionId,
    ports::{ConnectionError, OutboundFrame, SubscriberConnection},
};

/// A subscriber connection whose frames land in an unbounded channel.
///
/// Dropping the receiving half behaves like a peer that has disconnected:
/// every later send fails.
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
    send_delay: Option<Duration>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl ChannelConnection {
    /// Creates a connection and the receiver observing its frames.
    #[must_use]
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection = Self {
            id: ConnectionId::new(),
            sender,
            send_delay: None,
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        };
        (connection, receiver)
    }

    /// Delays every send, simulating a slow peer.
    #[must_use]
    pub const fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Returns `true` once [`SubscriberConnection::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns how many times the connection was closed.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriberConnection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<(), ConnectionError> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_closed() {
            return Err(ConnectionError::Closed(self.id));
        }
        self.sender
            .send(frame.clone())
            .map_err(|_| ConnectionError::Closed(self.id))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}
