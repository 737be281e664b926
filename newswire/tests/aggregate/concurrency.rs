use std::sync::Arc;

use crate::helpers::{ScriptedSource, item, wire};
use tokio_util::sync::CancellationToken;

use newswire::AggregateRequest;

/// One hundred simultaneous aggregations never corrupt the registry: the
/// total request count equals the sum of per-task increments.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn hundred_concurrent_fetches_keep_registry_consistent() {
    let sina = ScriptedSource::builder("sina")
        .returns_items_ok(vec![item("1", "盘中快讯一", "sina", 3)])
        .build();
    let tencent = ScriptedSource::builder("tencent")
        .returns_items_ok(vec![item("2", "盘中快讯二", "tencent", 4)])
        .build();

    let wire = Arc::new(wire(vec![sina, tencent]));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let wire = Arc::clone(&wire);
        handles.push(tokio::spawn(async move {
            wire.fetch_aggregated(
                &AggregateRequest::symbol("000001", 1),
                &CancellationToken::new(),
            )
            .await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
        ok += 1;
    }
    assert_eq!(ok, 100);

    // 100 calls × 2 sources.
    let total_requests: u64 = wire
        .source_metrics()
        .iter()
        .map(|(_, m)| m.requests)
        .sum();
    assert_eq!(total_requests, 200);

    let total_successes: u64 = wire
        .source_metrics()
        .iter()
        .map(|(_, m)| m.successes)
        .sum();
    assert_eq!(total_successes, 200);
}
