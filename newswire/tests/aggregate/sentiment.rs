use crate::helpers::{ScriptedSource, item, scored, wire};
use tokio_util::sync::CancellationToken;

use newswire::{AggregateRequest, SentimentLabel, Trend};

/// Majority label wins, the mean score aggregates, and rising daily means
/// report an upward trend.
#[tokio::test]
async fn sentiment_summary_reflects_labels_scores_and_slope() {
    // Three days of coverage, one item per day, scores rising.
    let items = vec![
        scored(
            item("1", "周一：市场情绪低迷", "sina", 2 * 24 * 60),
            SentimentLabel::Negative,
            -0.5,
        ),
        scored(
            item("2", "周二：市场情绪企稳", "sina", 24 * 60),
            SentimentLabel::Positive,
            0.0,
        ),
        scored(
            item("3", "周三：市场情绪回暖", "sina", 10),
            SentimentLabel::Positive,
            0.5,
        ),
    ];

    let sina = ScriptedSource::builder("sina").returns_items_ok(items).build();
    let wire = wire(vec![sina]);

    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 7),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let summary = &result.sentiment;
    assert_eq!(summary.counts.get(&SentimentLabel::Positive), Some(&2));
    assert_eq!(summary.counts.get(&SentimentLabel::Negative), Some(&1));
    assert_eq!(summary.overall, SentimentLabel::Positive);
    assert!((summary.score - 0.0).abs() < 1e-9);
    assert_eq!(summary.trend, Trend::Up);

    // Full confidence: nothing failed.
    assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.top_headlines.len(), 3);
}

/// A tie between labels falls back to neutral.
#[tokio::test]
async fn label_ties_report_neutral() {
    let items = vec![
        scored(item("1", "利好消息", "sina", 5), SentimentLabel::Positive, 0.4),
        scored(item("2", "利空消息", "sina", 5), SentimentLabel::Negative, -0.4),
    ];
    let sina = ScriptedSource::builder("sina").returns_items_ok(items).build();
    let wire = wire(vec![sina]);

    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.sentiment.overall, SentimentLabel::Neutral);
    assert_eq!(result.sentiment.trend, Trend::Stable);
}
