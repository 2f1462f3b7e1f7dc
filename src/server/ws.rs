//! Live WebSocket ingress and subscriber connections.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::relay::{
    domain::{ConnectionId, IngressOrigin},
    ports::{ConnectionError, MessageBus, MessageStore, OutboundFrame, SubscriberConnection},
    services::{Hub, IngressService},
};

/// Sending half of an upgraded socket.
pub type WebSocketSender = SplitSink<WebSocket, Message>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A hub subscriber writing JSON text frames to a WebSocket.
///
/// Writes are serialized through a mutex so broadcasts and replies to the
/// connection's own frames never interleave.
pub struct WsSubscriber {
    id: ConnectionId,
    sender: Mutex<WebSocketSender>,
}

impl WsSubscriber {
    /// Wraps the sending half of a socket.
    #[must_use]
    pub fn new(sender: WebSocketSender) -> Self {
        Self {
            id: ConnectionId::new(),
            sender: Mutex::new(sender),
        }
    }
}

#[async_trait]
impl SubscriberConnection for WsSubscriber {
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<(), ConnectionError> {
        let text =
            serde_json::to_string(frame).map_err(|err| ConnectionError::Encoding(err.to_string()))?;
        self.sender
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(ConnectionError::io)
    }

    async fn close(&self) {
        let closing = async { self.sender.lock().await.close().await };
        match tokio::time::timeout(CLOSE_TIMEOUT, closing).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(connection_id = %self.id, error = %err, "socket close failed"),
            Err(_) => tracing::debug!(connection_id = %self.id, "socket close timed out"),
        }
    }
}

/// Runs one upgraded socket until the peer leaves or the server shuts down.
///
/// The connection is registered with the hub for its whole lifetime. Every
/// text or binary frame is ingested with the connection as origin and the
/// resulting ack or rejection is written back to it.
pub async fn serve_socket<B, S, C>(
    socket: WebSocket,
    ingress: Arc<IngressService<B, S, C>>,
    hub: Arc<Hub>,
    shutdown: CancellationToken,
) where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    let (sender, mut receiver) = socket.split();
    let subscriber = Arc::new(WsSubscriber::new(sender));
    let id = subscriber.id();
    hub.add(Arc::clone(&subscriber) as Arc<dyn SubscriberConnection>)
        .await;

    loop {
        let incoming = tokio::select! {
            () = shutdown.cancelled() => break,
            incoming = receiver.next() => incoming,
        };
        let payload = match incoming {
            Some(Ok(Message::Text(text))) => text.into_bytes(),
            Some(Ok(Message::Binary(bytes))) => bytes,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Err(err)) => {
                tracing::warn!(connection_id = %id, error = %err, "socket read failed");
                break;
            }
        };
        respond_to_frame(
            &ingress,
            subscriber.as_ref(),
            &payload,
            hub.write_timeout(),
            &shutdown,
        )
        .await;
    }

    hub.remove(id).await;
}

/// Ingests one frame read from `connection` and writes the outcome back.
///
/// A failed reply is logged only; the read loop notices a dead peer on its
/// next read and the hub drops it on its next broadcast.
pub async fn respond_to_frame<B, S, C>(
    ingress: &IngressService<B, S, C>,
    connection: &dyn SubscriberConnection,
    payload: &[u8],
    write_timeout: Duration,
    cancel: &CancellationToken,
) where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    let id = connection.id();
    let frame = match ingress
        .ingest(payload, IngressOrigin::Live(id), cancel)
        .await
    {
        Ok(ack) => OutboundFrame::Ack(ack),
        Err(err) => {
            tracing::debug!(connection_id = %id, error = %err, "live frame rejected");
            OutboundFrame::Rejected {
                error: err.to_string(),
            }
        }
    };

    let reply = tokio::time::timeout(write_timeout, connection.send(&frame))
        .await
        .unwrap_or(Err(ConnectionError::Timeout(id)));
    if let Err(err) = reply {
        tracing::debug!(connection_id = %id, error = %err, "reply to sender failed");
    }
}
