//! Messages published through ingress reach subscribers and history.

use crate::in_memory::helpers::{Relay, next_message, relay, runtime, wait_for_stored};
use chat_relay::relay::{
    domain::{IngestStatus, IngressOrigin, MessageId},
    ports::SubscriberConnection,
    services::RelayExit,
};
use rstest::rstest;
use std::io;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Tests that a posted message is broadcast once and then stored.
#[rstest]
fn posted_message_is_broadcast_and_stored(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        let (_watcher, mut frames) = relay.subscribe().await;
        let cancel = CancellationToken::new();
        let worker = tokio::spawn({
            let relay_loop = std::sync::Arc::clone(&relay.relay);
            let cancel = cancel.clone();
            async move { relay_loop.run(cancel).await }
        });

        let ack = relay
            .ingress
            .ingest(
                br#"{"user_id":"alice","content":"hello"}"#,
                IngressOrigin::OneShot,
                &cancel,
            )
            .await
            .expect("accepted");
        assert_eq!(ack.status, IngestStatus::Enqueued);

        let delivered = next_message(&mut frames).await.expect("message relayed");
        assert_eq!(delivered.id(), &ack.id);
        assert_eq!(delivered.content(), "hello");
        assert!(wait_for_stored(&relay.store, 1).await, "message stored");

        let history = relay.ingress.history().await.expect("history readable");
        assert_eq!(history, vec![delivered]);

        cancel.cancel();
        let report = worker.await.expect("relay task joins");
        assert!(matches!(report.exit, RelayExit::Cancelled));
        assert_eq!(report.stats.relayed, 1);
        assert_eq!(report.stats.stored, 1);
    });
}

/// Tests that the relayed copy also reaches the live sender.
#[rstest]
fn live_sender_receives_relayed_copy(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        let (sender, mut sender_frames) = relay.subscribe().await;
        let (_peer, mut peer_frames) = relay.subscribe().await;
        let cancel = CancellationToken::new();
        let worker = tokio::spawn({
            let relay_loop = std::sync::Arc::clone(&relay.relay);
            let cancel = cancel.clone();
            async move { relay_loop.run(cancel).await }
        });

        relay
            .ingress
            .ingest(
                br#"{"user_id":"bob","content":"hi all"}"#,
                IngressOrigin::Live(sender.id()),
                &cancel,
            )
            .await
            .expect("accepted");

        let to_sender = next_message(&mut sender_frames).await.expect("sender copy");
        let to_peer = next_message(&mut peer_frames).await.expect("peer copy");
        assert_eq!(to_sender, to_peer);

        cancel.cancel();
        worker.await.expect("relay task joins");
    });
}

/// Tests that publishing one identifier twice stores a single record.
#[rstest]
fn repeated_identifier_is_stored_once(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        let (_watcher, mut frames) = relay.subscribe().await;
        let cancel = CancellationToken::new();
        let worker = tokio::spawn({
            let relay_loop = std::sync::Arc::clone(&relay.relay);
            let cancel = cancel.clone();
            async move { relay_loop.run(cancel).await }
        });

        for content in ["first", "second"] {
            let payload = format!(r#"{{"id":"fixed-1","user_id":"alice","content":"{content}"}}"#);
            let ack = relay
                .ingress
                .ingest(payload.as_bytes(), IngressOrigin::OneShot, &cancel)
                .await
                .expect("accepted");
            assert_eq!(ack.id, MessageId::new("fixed-1"));
        }

        assert!(next_message(&mut frames).await.is_some());
        assert!(next_message(&mut frames).await.is_some());

        cancel.cancel();
        let report = worker.await.expect("relay task joins");
        assert_eq!(report.stats.stored, 1);
        assert_eq!(report.stats.duplicates, 1);

        let history = relay.ingress.history().await.expect("history readable");
        assert_eq!(history.len(), 1);
        assert_eq!(history.first().map(|m| m.content()), Some("first"));
    });
}
