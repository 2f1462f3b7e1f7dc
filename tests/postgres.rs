//! Integration tests for the `PostgreSQL` store and bus adapters.
//!
//! These tests run the adapters against an embedded `PostgreSQL` instance,
//! covering first-write-wins upserts, history ordering, and consumer offset
//! resumption for bus readers.
//!
//! Uses `pg-embed-setup-unpriv` for embedded `PostgreSQL` lifecycle management.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]
#![expect(
    clippy::indexing_slicing,
    reason = "Test code uses indexing after length checks"
)]
#![expect(
    clippy::print_stderr,
    reason = "Test cleanup warnings are informational"
)]

use chat_relay::relay::{
    adapters::postgres::{PostgresMessageBus, PostgresMessageStore, RelayPgPool, build_pool},
    domain::{ChatMessage, MessageId},
    ports::{BusDelivery, BusReader, MessageBus, MessageStore, UpsertOutcome},
};
use chrono::{DateTime, TimeZone, Utc};
use diesel::prelude::*;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;
use std::time::Duration;
use tokio::runtime::Runtime;

/// SQL creating the relay tables.
const CREATE_SCHEMA_SQL: &str =
    include_str!("../migrations/2026-10-01-000000_create_relay_tables/up.sql");

/// Template database name for pre-migrated schema.
const TEMPLATE_DB: &str = "chat_relay_test_template";

/// Upper bound on a single bus read in these tests.
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates a tokio runtime for async operations in tests.
fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
fn ensure_template(cluster: &TestCluster) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            execute_sql_statements(&mut conn, CREATE_SCHEMA_SQL)?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    Ok(())
}

/// Executes multiple SQL statements from a single string.
///
/// `diesel::sql_query` runs one statement per call, so the migration is
/// split on semicolons.
fn execute_sql_statements(conn: &mut PgConnection, sql: &str) -> eyre::Result<()> {
    for statement in sql.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() || trimmed.lines().all(|line| line.trim().starts_with("--")) {
            continue;
        }
        diesel::sql_query(trimmed)
            .execute(conn)
            .map_err(|e| eyre::eyre!("SQL error: {e}\nStatement: {trimmed}"))?;
    }
    Ok(())
}

/// Creates a test database from the template and returns a pool over it.
fn setup_pool(
    cluster: &TestCluster,
    db_name: &str,
) -> Result<RelayPgPool, Box<dyn std::error::Error + Send + Sync>> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
    let url = cluster.connection().database_url(db_name);
    // A single connection keeps statement ordering deterministic.
    let pool = build_pool(&url, 1)?;
    Ok(pool)
}

/// Guard that drops the test database even if the test panics.
struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl<'a> CleanupGuard<'a> {
    const fn new(cluster: &'a TestCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn message(id: &str, content: &str, created_at: DateTime<Utc>) -> ChatMessage {
    ChatMessage::new(MessageId::new(id), "alice", content, created_at)
}

async fn read_next(reader: &mut Box<dyn BusReader>) -> BusDelivery {
    tokio::time::timeout(READ_TIMEOUT, reader.next_delivery())
        .await
        .expect("record within timeout")
        .expect("read succeeds")
        .expect("topic still open")
}

// ============================================================================
// Message store
// ============================================================================

#[rstest]
fn upsert_keeps_first_content(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_upsert_first_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = PostgresMessageStore::new(setup_pool(shared_test_cluster, &db_name).expect("pool"));

    let rt = test_runtime();
    let first = message("m-1", "original", at(9, 0));
    let second = message("m-1", "rewritten", at(9, 5));

    let outcome = rt.block_on(store.upsert(&first)).expect("first upsert");
    assert_eq!(outcome, UpsertOutcome::Inserted);
    let outcome = rt.block_on(store.upsert(&second)).expect("second upsert");
    assert_eq!(outcome, UpsertOutcome::AlreadyPresent);

    let history = rt.block_on(store.read_all()).expect("read_all");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], first);
}

#[rstest]
fn read_all_orders_by_creation_time_then_insertion(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_read_order_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = PostgresMessageStore::new(setup_pool(shared_test_cluster, &db_name).expect("pool"));

    let rt = test_runtime();
    let late = message("late", "third", at(11, 0));
    let tied_first = message("tied-b", "first at ten", at(10, 0));
    let early = message("early", "earliest", at(8, 30));
    let tied_second = message("tied-a", "second at ten", at(10, 0));

    for record in [&late, &tied_first, &early, &tied_second] {
        rt.block_on(store.upsert(record)).expect("upsert");
    }

    let ids: Vec<String> = rt
        .block_on(store.read_all())
        .expect("read_all")
        .iter()
        .map(|record| record.id().as_str().to_owned())
        .collect();
    assert_eq!(ids, ["early", "tied-b", "tied-a", "late"]);
}

#[rstest]
fn ping_succeeds_against_live_database(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_ping_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let store = PostgresMessageStore::new(setup_pool(shared_test_cluster, &db_name).expect("pool"));

    test_runtime().block_on(store.ping()).expect("ping");
}

// ============================================================================
// Message bus
// ============================================================================

#[rstest]
fn reader_resumes_after_committed_offset(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_bus_resume_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let pool = setup_pool(shared_test_cluster, &db_name).expect("pool");
    let bus = PostgresMessageBus::new(pool).with_poll_interval(Duration::from_millis(10));

    let rt = test_runtime();
    rt.block_on(async {
        for key in ["k1", "k2", "k3"] {
            bus.send("chat", key, key.as_bytes().to_vec())
                .await
                .expect("send");
        }

        let mut reader = bus.open_reader("chat", "relay").await.expect("open reader");
        assert_eq!(read_next(&mut reader).await.key, "k1");
        // Requesting the next record commits the previous one.
        assert_eq!(read_next(&mut reader).await.key, "k2");
        drop(reader);

        let mut reopened = bus.open_reader("chat", "relay").await.expect("reopen reader");
        let redelivered = read_next(&mut reopened).await;
        assert_eq!(redelivered.key, "k2");
        assert_eq!(redelivered.payload, b"k2".to_vec());
        assert_eq!(read_next(&mut reopened).await.key, "k3");
    });
}

#[rstest]
fn consumers_and_topics_track_positions_independently(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_bus_isolation_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let pool = setup_pool(shared_test_cluster, &db_name).expect("pool");
    let bus = PostgresMessageBus::new(pool).with_poll_interval(Duration::from_millis(10));

    let rt = test_runtime();
    rt.block_on(async {
        bus.send("chat", "k1", b"one".to_vec()).await.expect("send");
        bus.send("chat", "k2", b"two".to_vec()).await.expect("send");

        let mut first = bus.open_reader("chat", "relay").await.expect("open reader");
        let _ = read_next(&mut first).await;
        let _ = read_next(&mut first).await;

        let mut other = bus.open_reader("chat", "audit").await.expect("open reader");
        assert_eq!(read_next(&mut other).await.key, "k1");

        let mut dlq = bus.open_reader("dlq", "relay").await.expect("open reader");
        let idle = tokio::time::timeout(Duration::from_millis(200), dlq.next_delivery()).await;
        assert!(idle.is_err(), "empty topic should not yield a record");
    });
}
