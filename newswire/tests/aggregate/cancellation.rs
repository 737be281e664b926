use std::time::Duration;

use crate::helpers::{ScriptedSource, wire};
use tokio_util::sync::CancellationToken;

use newswire::{AggregateRequest, NewswireError};

/// Cancelling an aggregation returns `Cancelled` promptly no matter how
/// slow the sources are.
#[tokio::test(flavor = "multi_thread")]
async fn cancel_returns_within_half_a_second() {
    let slow = ScriptedSource::builder("sina")
        .delay(Duration::from_secs(30))
        .returns_items_ok(vec![])
        .build();
    let wire = wire(vec![slow]);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = wire
        .fetch_aggregated(&AggregateRequest::symbol("000001", 1), &cancel)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, NewswireError::Cancelled));
    assert!(
        elapsed < Duration::from_millis(500),
        "cancellation took {elapsed:?}"
    );
}

/// A token cancelled before the call short-circuits the same way.
#[tokio::test]
async fn pre_cancelled_token_short_circuits() {
    let slow = ScriptedSource::builder("sina")
        .delay(Duration::from_secs(30))
        .returns_items_ok(vec![])
        .build();
    let wire = wire(vec![slow]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = wire
        .fetch_aggregated(&AggregateRequest::symbol("000001", 1), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, NewswireError::Cancelled));
}
