//! Tests for the in-memory adapters.

use std::time::Duration;

use super::fixtures::message_at;
use crate::relay::{
    adapters::memory::{ChannelConnection, InMemoryMessageBus, InMemoryMessageStore},
    ports::{
        BusError, ConnectionError, MessageBus, MessageStore, OutboundFrame, StoreError,
        SubscriberConnection, UpsertOutcome,
    },
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_upsert_is_idempotent_and_first_write_wins() {
    let store = InMemoryMessageStore::new();
    let original = message_at("m-1", "original", 0);
    let rewrite = message_at("m-1", "rewritten", 9);

    assert_eq!(
        store.upsert(&original).await.expect("upsert"),
        UpsertOutcome::Inserted
    );
    assert_eq!(
        store.upsert(&rewrite).await.expect("upsert"),
        UpsertOutcome::AlreadyPresent
    );

    assert_eq!(store.read_all().await.expect("history"), vec![original]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_keeps_arrival_order_for_equal_timestamps() {
    let store = InMemoryMessageStore::new();
    let first = message_at("b", "first", 0);
    let second = message_at("a", "second", 0);
    store.upsert(&first).await.expect("upsert");
    store.upsert(&second).await.expect("upsert");

    assert_eq!(store.read_all().await.expect("history"), vec![first, second]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_store_reports_connection_errors() {
    let store = InMemoryMessageStore::new();
    store.set_failing("db down").expect("inject failure");

    assert!(matches!(
        store.upsert(&message_at("m-1", "x", 0)).await,
        Err(StoreError::Connection(_))
    ));
    assert!(store.ping().await.is_err());

    store.recover().expect("recover");
    assert!(store.ping().await.is_ok());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bus_reader_wakes_on_append() {
    let bus = std::sync::Arc::new(InMemoryMessageBus::new());
    let mut reader = bus.open_reader("topic", "consumer").await.expect("reader");
    let publisher = std::sync::Arc::clone(&bus);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        publisher
            .send("topic", "k", b"payload".to_vec())
            .await
            .expect("send");
    });

    let delivery = tokio::time::timeout(Duration::from_secs(5), reader.next_delivery())
        .await
        .expect("reader wakes")
        .expect("read succeeds")
        .expect("record available");

    assert_eq!(delivery.offset, 0);
    assert_eq!(delivery.key, "k");
    assert_eq!(delivery.payload, b"payload".to_vec());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bus_consumers_track_positions_independently() {
    let bus = InMemoryMessageBus::new();
    bus.send("topic", "k", b"one".to_vec()).await.expect("send");
    bus.close().expect("close");

    let mut first = bus.open_reader("topic", "first").await.expect("reader");
    let mut second = bus.open_reader("topic", "second").await.expect("reader");

    assert!(first.next_delivery().await.expect("read").is_some());
    assert!(first.next_delivery().await.expect("read").is_none());
    assert!(second.next_delivery().await.expect("read").is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closed_bus_rejects_sends() {
    let bus = InMemoryMessageBus::new();
    bus.close().expect("close");

    assert!(matches!(
        bus.send("topic", "k", Vec::new()).await,
        Err(BusError::Closed(_))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn channel_connection_fails_after_peer_drops() {
    let (connection, frames) = ChannelConnection::pair();
    drop(frames);

    let result = connection
        .send(&OutboundFrame::Rejected {
            error: "nope".to_owned(),
        })
        .await;

    assert!(matches!(result, Err(ConnectionError::Closed(id)) if id == connection.id()));
}
