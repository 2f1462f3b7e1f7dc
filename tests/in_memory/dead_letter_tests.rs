//! Store failures while relaying route records to the dead-letter topic.

use crate::in_memory::helpers::{Relay, next_message, relay, runtime};
use chat_relay::relay::{
    domain::{DeadLetterEntry, IngestStatus, IngressOrigin, PERSIST_FAILURE},
    services::{DEFAULT_DLQ_TOPIC, RelayExit},
};
use rstest::rstest;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

async fn wait_for_dead_letters(relay: &Relay, expected: usize) -> bool {
    for _ in 0..200 {
        if relay
            .bus
            .records(DEFAULT_DLQ_TOPIC)
            .is_ok_and(|records| records.len() >= expected)
        {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Tests that a failed upsert still broadcasts and records a dead letter.
#[rstest]
fn failed_upsert_is_dead_lettered(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        let (_watcher, mut frames) = relay.subscribe().await;
        let cancel = CancellationToken::new();
        let worker = tokio::spawn({
            let relay_loop = Arc::clone(&relay.relay);
            let cancel = cancel.clone();
            async move { relay_loop.run(cancel).await }
        });

        // Ingress only reads the store on the fallback path.
        relay.store.set_failing("disk full").expect("inject failure");
        let ack = relay
            .ingress
            .ingest(
                br#"{"user_id":"alice","content":"keep me"}"#,
                IngressOrigin::OneShot,
                &cancel,
            )
            .await
            .expect("accepted");
        assert_eq!(ack.status, IngestStatus::Enqueued);

        let delivered = next_message(&mut frames).await.expect("still broadcast");
        assert!(wait_for_dead_letters(&relay, 1).await, "dead letter published");

        let records = relay.bus.records(DEFAULT_DLQ_TOPIC).expect("records readable");
        let entry: DeadLetterEntry = records
            .first()
            .map(|record| serde_json::from_slice(&record.payload))
            .expect("one record")
            .expect("entry decodes");
        assert_eq!(entry.reason, PERSIST_FAILURE);
        assert_eq!(entry.message, delivered);

        cancel.cancel();
        let report = worker.await.expect("relay task joins");
        assert!(matches!(report.exit, RelayExit::Cancelled));
        assert_eq!(report.stats.dead_lettered, 1);
        assert_eq!(report.stats.stored, 0);
    });
}

/// Tests that the loop keeps relaying after the store recovers.
#[rstest]
fn relay_continues_after_store_recovers(runtime: io::Result<Runtime>, relay: Relay) {
    let rt = runtime.expect("runtime creation");
    rt.block_on(async {
        let (_watcher, mut frames) = relay.subscribe().await;
        let cancel = CancellationToken::new();
        let worker = tokio::spawn({
            let relay_loop = Arc::clone(&relay.relay);
            let cancel = cancel.clone();
            async move { relay_loop.run(cancel).await }
        });

        relay.store.set_failing("disk full").expect("inject failure");
        relay
            .ingress
            .ingest(
                br#"{"user_id":"alice","content":"lost"}"#,
                IngressOrigin::OneShot,
                &cancel,
            )
            .await
            .expect("accepted");
        assert!(next_message(&mut frames).await.is_some());
        assert!(wait_for_dead_letters(&relay, 1).await);

        relay.store.recover().expect("recover store");
        relay
            .ingress
            .ingest(
                br#"{"user_id":"alice","content":"kept"}"#,
                IngressOrigin::OneShot,
                &cancel,
            )
            .await
            .expect("accepted");
        let kept = next_message(&mut frames).await.expect("second message");

        cancel.cancel();
        let report = worker.await.expect("relay task joins");
        assert_eq!(report.stats.relayed, 2);
        assert_eq!(report.stats.dead_lettered, 1);

        let history = relay.ingress.history().await.expect("history readable");
        assert_eq!(history, vec![kept]);
    });
}
