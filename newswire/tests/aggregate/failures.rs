use std::time::Duration;

use crate::helpers::{ScriptedSource, item, wire};
use tokio_util::sync::CancellationToken;

use newswire::{AggregateRequest, AggregationConfig, Newswire, NewswireError, SourceConfig};

#[tokio::test]
async fn empty_symbol_is_rejected() {
    let sina = ScriptedSource::builder("sina").returns_items_ok(vec![]).build();
    let wire = wire(vec![sina]);

    let err = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("  ", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NewswireError::InvalidArg(_)));
}

#[tokio::test]
async fn unknown_requested_source_is_rejected() {
    let sina = ScriptedSource::builder("sina").returns_items_ok(vec![]).build();
    let wire = wire(vec![sina]);

    let err = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1).with_sources(["nosuch"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    match err {
        NewswireError::InvalidArg(msg) => assert!(msg.contains("nosuch")),
        other => panic!("expected InvalidArg, got {other:?}"),
    }
}

/// Individual failures are tolerated as long as anything was produced.
#[tokio::test]
async fn partial_failure_degrades_confidence_not_the_call() {
    let healthy = ScriptedSource::builder("sina")
        .returns_items_ok(vec![item("1", "盘面快讯", "sina", 3)])
        .build();
    let broken = ScriptedSource::builder("tencent")
        .fails_with(NewswireError::source("tencent", "HTTP 502"))
        .build();

    let wire = wire(vec![healthy, broken]);
    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!((result.confidence - 0.5).abs() < f64::EPSILON);
}

/// Zero items plus at least one error fails the whole phase.
#[tokio::test]
async fn all_failing_sources_surface_all_sources_failed() {
    let a = ScriptedSource::builder("sina")
        .fails_with(NewswireError::source("sina", "HTTP 500"))
        .build();
    let b = ScriptedSource::builder("tencent")
        .fails_with(NewswireError::source("tencent", "connection refused"))
        .build();

    let wire = wire(vec![a, b]);
    let err = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    match err {
        NewswireError::AllSourcesFailed(reasons) => assert_eq!(reasons.len(), 2),
        other => panic!("expected AllSourcesFailed, got {other:?}"),
    }
}

/// Per-source timeouts are reported as timeouts, not opaque failures.
#[tokio::test(flavor = "multi_thread")]
async fn slow_sources_hit_the_adapter_timeout() {
    let slow = ScriptedSource::builder("sina")
        .delay(Duration::from_secs(5))
        .returns_items_ok(vec![])
        .build();

    let cfg = AggregationConfig {
        adapter_timeout: Duration::from_millis(50),
        ..AggregationConfig::default()
    };
    let wire = Newswire::builder()
        .with_source(SourceConfig::new("sina", 1), slow)
        .aggregation_config(cfg)
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NewswireError::RequestTimeout));
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// The overall deadline bounds the whole fan-out.
#[tokio::test(flavor = "multi_thread")]
async fn overall_deadline_bounds_the_request() {
    let slow = ScriptedSource::builder("sina")
        .delay(Duration::from_secs(5))
        .returns_items_ok(vec![])
        .build();

    let cfg = AggregationConfig {
        adapter_timeout: Duration::from_secs(30),
        overall_timeout: Duration::from_millis(80),
        ..AggregationConfig::default()
    };
    let wire = Newswire::builder()
        .with_source(SourceConfig::new("sina", 1), slow)
        .aggregation_config(cfg)
        .build()
        .unwrap();

    let err = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NewswireError::RequestTimeout));
}

#[test]
fn builder_rejects_mismatched_ids_and_empty_sets() {
    let err = Newswire::builder().build().unwrap_err();
    assert!(matches!(err, NewswireError::InvalidArg(_)));

    let sina = ScriptedSource::builder("sina").returns_items_ok(vec![]).build();
    let err = Newswire::builder()
        .with_source(SourceConfig::new("tencent", 1), sina)
        .build()
        .unwrap_err();
    assert!(matches!(err, NewswireError::InvalidArg(_)));
}
