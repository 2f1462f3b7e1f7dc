//! Runs the chat relay: HTTP and WebSocket ingress, the relay loop, and the
//! health and metrics endpoints.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://… AUTH_TOKENS=secret relayd --api-port 8080
//! ```
//!
//! Without `DATABASE_URL` the bus and store are in-memory, which suits a
//! single-process development setup. Ctrl-C cancels the root token, stops
//! the server gracefully, and waits for the relay loop to finish.

use chat_relay::{
    config::RelayConfig,
    relay::{
        adapters::{
            PrometheusRelayMetrics, StaticTokenVerifier, TokioSleeper,
            memory::{InMemoryMessageBus, InMemoryMessageStore},
            postgres::{PostgresMessageBus, PostgresMessageStore, build_pool},
        },
        ports::{MessageBus, MessageStore, RelayMetrics, Sleeper, TokenVerifier},
        services::{BusClient, Hub, IngressService, RelayLoop},
        validation::DefaultSchemaValidator,
    },
    server::{self, AppState},
    telemetry,
};
use mockable::DefaultClock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = RelayConfig::load();
    telemetry::init(config.log_format)?;

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    if let Some(url) = config.database_url.as_deref() {
        let pool = build_pool(url, config.database_pool_size)?;
        let bus = PostgresMessageBus::new(pool.clone()).with_poll_interval(config.bus_poll_interval);
        let store = PostgresMessageStore::new(pool);
        run(&config, bus, store, &shutdown).await
    } else {
        tracing::warn!("DATABASE_URL is not set; using in-memory bus and store");
        run(
            &config,
            InMemoryMessageBus::new(),
            InMemoryMessageStore::new(),
            &shutdown,
        )
        .await
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
            Err(err) => tracing::error!(error = %err, "could not listen for shutdown signal"),
        }
    });
}

async fn run<B, S>(
    config: &RelayConfig,
    bus: B,
    store: S,
    shutdown: &CancellationToken,
) -> Result<(), BoxError>
where
    B: MessageBus + 'static,
    S: MessageStore + 'static,
{
    let metrics = Arc::new(PrometheusRelayMetrics::new()?);
    let sink = Arc::clone(&metrics) as Arc<dyn RelayMetrics>;
    let clock = Arc::new(DefaultClock);
    let store = Arc::new(store);
    let hub = Arc::new(
        Hub::new(Arc::clone(&sink)).with_write_timeout(config.broadcast_write_timeout),
    );
    let client = Arc::new(
        BusClient::new(
            Arc::new(bus),
            Arc::new(TokioSleeper) as Arc<dyn Sleeper>,
            Arc::clone(&clock),
        )
        .with_topics(config.bus_topics())
        .with_policy(config.retry_policy()),
    );
    let ingress = Arc::new(
        IngressService::new(
            Arc::clone(&client),
            Arc::clone(&store),
            Arc::clone(&hub),
            Arc::new(DefaultSchemaValidator::new()),
            Arc::clone(&sink),
            clock,
        )
        .with_max_content_len(config.message_max_length),
    );

    let relay = RelayLoop::new(client, store, Arc::clone(&hub), sink);
    let relay_shutdown = shutdown.clone();
    let relay_task = tokio::spawn(async move {
        let report = relay.run(relay_shutdown.clone()).await;
        if !report.exit.is_cancelled() {
            tracing::error!(exit = ?report.exit, "relay loop stopped unexpectedly; shutting down");
            relay_shutdown.cancel();
        }
        report
    });

    if config.auth_tokens.is_empty() {
        tracing::warn!("AUTH_TOKENS is empty; every request will be refused");
    }
    let verifier = Arc::new(StaticTokenVerifier::new(config.auth_tokens.clone()));
    let state = AppState {
        ingress,
        hub,
        verifier: verifier as Arc<dyn TokenVerifier>,
        metrics,
        shutdown: shutdown.clone(),
    };

    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.api_port))).await?;
    let served = server::serve(listener, server::router(state), shutdown.clone()).await;
    shutdown.cancel();

    match relay_task.await {
        Ok(report) => tracing::info!(
            exit = ?report.exit,
            relayed = report.stats.relayed,
            dead_lettered = report.stats.dead_lettered,
            "relay loop finished"
        ),
        Err(err) => tracing::error!(error = %err, "relay task failed"),
    }
    served?;
    Ok(())
}
