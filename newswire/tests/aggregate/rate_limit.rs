use std::time::Duration;

use crate::helpers::{ScriptedSource, item};
use tokio_util::sync::CancellationToken;

use newswire::{AggregateRequest, FetchOutcome, Newswire, NewswireError, SourceConfig, SourceKey};

fn build_wire(cooldown: Duration) -> Newswire {
    let xueqiu = ScriptedSource::builder("xueqiu")
        .returns_items_ok(vec![item("1", "雪球热帖：看好银行板块", "xueqiu", 5)])
        .build();
    Newswire::builder()
        .with_source(SourceConfig::new("xueqiu", 3), xueqiu)
        .rate_limit_cooldown(cooldown)
        .build()
        .unwrap()
}

/// A rate-limited source fails an explicit request with the rate-limit
/// reason inside `AllSourcesFailed`, then recovers after the cool-down
/// without operator intervention.
#[tokio::test(flavor = "multi_thread")]
async fn rate_limited_source_recovers_after_cooldown() {
    let wire = build_wire(Duration::from_millis(120));
    let key = SourceKey::new("xueqiu");
    let request = AggregateRequest::symbol("000001", 1).with_sources(["xueqiu"]);

    wire.registry().record_outcome(&key, &FetchOutcome::RateLimited);
    assert!(!wire.registry().may_request(&key));

    let err = wire
        .fetch_aggregated(&request, &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        NewswireError::AllSourcesFailed(reasons) => {
            assert_eq!(reasons.len(), 1);
            assert!(matches!(reasons[0], NewswireError::RateLimited { .. }));
        }
        other => panic!("expected AllSourcesFailed, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(wire.registry().may_request(&key));
    let result = wire
        .fetch_aggregated(&request, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.items.len(), 1);
}

/// A source that reports a rate limit mid-fetch lands in cool-down, and the
/// skip is reflected in the error summary of a mixed fan-out.
#[tokio::test(flavor = "multi_thread")]
async fn mid_fetch_rate_limit_enters_cooldown() {
    let limited = ScriptedSource::builder("xueqiu")
        .fails_with(NewswireError::RateLimited {
            source: "xueqiu".to_string(),
            retry_in_ms: 60_000,
        })
        .build();
    let healthy = ScriptedSource::builder("sina")
        .returns_items_ok(vec![item("1", "盘面快讯", "sina", 3)])
        .build();

    let wire = Newswire::builder()
        .with_source(SourceConfig::new("sina", 1), healthy)
        .with_source(SourceConfig::new("xueqiu", 3), limited)
        .rate_limit_cooldown(Duration::from_secs(60))
        .build()
        .unwrap();

    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // The healthy source's items survive; the limited one is an error entry.
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source, "xueqiu");
    assert!((result.confidence - 0.5).abs() < f64::EPSILON);

    // And the registry now gates it.
    assert!(!wire.registry().may_request(&SourceKey::new("xueqiu")));
}
