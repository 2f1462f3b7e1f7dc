//! Ingress behaviour while the bus cannot accept records.

use crate::in_memory::helpers::{Relay, next_message, relay, runtime};
use chat_relay::relay::{
    domain::{IngestStatus, IngressOrigin},
    ports::SubscriberConnection,
    services::DEFAULT_TOPIC,
};
use rstest::rstest;
use std::io;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

/// Tests that an outage delivers directly to peers and stores the message.
#[rstest]
fn outage_delivers_to_peers_and_stores(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        relay.bus.set_unavailable("broker down").expect("inject outage");
        let (sender, mut sender_frames) = relay.subscribe().await;
        let (_peer, mut peer_frames) = relay.subscribe().await;

        let ack = relay
            .ingress
            .ingest(
                br#"{"user_id":"bob","content":"anyone there?"}"#,
                IngressOrigin::Live(sender.id()),
                &CancellationToken::new(),
            )
            .await
            .expect("accepted");

        assert_eq!(ack.status, IngestStatus::BroadcastedFallback);
        let delivered = next_message(&mut peer_frames).await.expect("peer copy");
        assert_eq!(delivered.id(), &ack.id);
        assert!(
            sender_frames.try_recv().is_err(),
            "sender gets no echo on the fallback path"
        );

        let history = relay.ingress.history().await.expect("history readable");
        assert_eq!(history, vec![delivered]);
    });
}

/// Tests that transient send failures are retried before falling back.
#[rstest]
fn transient_failures_are_retried(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        relay.bus.fail_next_sends(2).expect("inject failures");

        let ack = relay
            .ingress
            .ingest(
                br#"{"user_id":"alice","content":"retry me"}"#,
                IngressOrigin::OneShot,
                &CancellationToken::new(),
            )
            .await
            .expect("accepted");

        assert_eq!(ack.status, IngestStatus::Enqueued);
        assert_eq!(relay.bus.send_attempts().expect("attempts"), 3);
        assert!(relay.store.is_empty().expect("store readable"));
    });
}

/// Tests that a message accepted during an outage is not re-published later.
#[rstest]
fn recovery_does_not_replay_fallback_messages(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        relay.bus.set_unavailable("broker down").expect("inject outage");
        relay
            .ingress
            .ingest(
                br#"{"user_id":"alice","content":"during outage"}"#,
                IngressOrigin::OneShot,
                &CancellationToken::new(),
            )
            .await
            .expect("accepted");
        relay.bus.restore().expect("restore bus");

        let records = relay.bus.records(DEFAULT_TOPIC).expect("records readable");
        assert!(records.is_empty());
        assert_eq!(relay.store.len().expect("store readable"), 1);
    });
}
