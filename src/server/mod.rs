//! HTTP and WebSocket transport over the relay pipeline.
//!
//! A thin `axum` layer: handlers authenticate, hand payloads to
//! [`IngressService`], and map results to status codes. Nothing here holds
//! pipeline state of its own.
//!
//! # Routes
//!
//! - `GET /ws`, `GET /api/ws`: live connection, token in `?token=`
//! - `POST /messages`, `POST /api/messages`: one-shot ingestion
//! - `GET /messages`, `GET /api/messages`: full history
//! - `GET /healthz`, `GET /readyz`, `GET /metrics`

mod auth;
mod error;
mod ws;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use mockable::Clock;
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::relay::{
    adapters::PrometheusRelayMetrics,
    domain::{ChatMessage, IngestAck, IngressOrigin},
    ports::{MessageBus, MessageStore, TokenVerifier},
    services::{Hub, IngressService},
};

pub use auth::{authorize, bearer_token};
pub use error::ApiError;
pub use ws::{WebSocketSender, WsSubscriber, respond_to_frame, serve_socket};

/// Shared state handed to every handler.
pub struct AppState<B, S, C>
where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    /// Ingestion and history entrypoints.
    pub ingress: Arc<IngressService<B, S, C>>,
    /// Live subscriber registry.
    pub hub: Arc<Hub>,
    /// Token verifier for both ingress paths.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Metrics registry rendered by `/metrics`.
    pub metrics: Arc<PrometheusRelayMetrics>,
    /// Root cancellation token; fires on shutdown.
    pub shutdown: CancellationToken,
}

impl<B, S, C> Clone for AppState<B, S, C>
where
    B: MessageBus,
    S: MessageStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            ingress: Arc::clone(&self.ingress),
            hub: Arc::clone(&self.hub),
            verifier: Arc::clone(&self.verifier),
            metrics: Arc::clone(&self.metrics),
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Builds the application router.
pub fn router<B, S, C>(state: AppState<B, S, C>) -> Router
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/ws", get(ws_upgrade::<B, S, C>))
        .route("/api/ws", get(ws_upgrade::<B, S, C>))
        .route(
            "/messages",
            get(list_messages::<B, S, C>).post(post_message::<B, S, C>),
        )
        .route(
            "/api/messages",
            get(list_messages::<B, S, C>).post(post_message::<B, S, C>),
        )
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<B, S, C>))
        .route("/metrics", get(metrics::<B, S, C>))
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` fires.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "http server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

#[derive(Debug, Default, Deserialize)]
struct WsParams {
    #[serde(default)]
    token: Option<String>,
}

async fn ws_upgrade<B, S, C>(
    State(state): State<AppState<B, S, C>>,
    Query(params): Query<WsParams>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError>
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    let token = params.token.unwrap_or_default();
    state.verifier.verify(&token).await?;

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let AppState {
        ingress,
        hub,
        shutdown,
        ..
    } = state;
    Ok(upgrade.on_upgrade(move |socket| serve_socket(socket, ingress, hub, shutdown)))
}

async fn post_message<B, S, C>(
    State(state): State<AppState<B, S, C>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestAck>), ApiError>
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    authorize(state.verifier.as_ref(), &headers).await?;
    let ack = state
        .ingress
        .ingest(&body, IngressOrigin::OneShot, &state.shutdown)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

async fn list_messages<B, S, C>(
    State(state): State<AppState<B, S, C>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatMessage>>, ApiError>
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    authorize(state.verifier.as_ref(), &headers).await?;
    Ok(Json(state.ingress.history().await?))
}

#[expect(clippy::unused_async, reason = "axum handlers are async functions")]
async fn healthz() -> &'static str {
    "ok"
}

async fn readyz<B, S, C>(State(state): State<AppState<B, S, C>>) -> Response
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    match state.ingress.ready().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable").into_response()
        }
    }
}

async fn metrics<B, S, C>(State(state): State<AppState<B, S, C>>) -> Result<Response, ApiError>
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    let body = state.metrics.render()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}
