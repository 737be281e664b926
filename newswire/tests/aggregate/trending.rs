use crate::helpers::{ScriptedSource, item, wire};
use tokio_util::sync::CancellationToken;

use newswire::{AggregateRequest, SentimentLabel};

/// Six items tagged "AI" within two hours across three providers synthesise
/// one trending topic with full relevance.
#[tokio::test]
async fn repeated_tag_synthesises_a_trending_topic() {
    let providers = ["sina", "tencent", "eastmoney"];
    let mut batches: Vec<Vec<newswire::NewsItem>> = vec![Vec::new(); 3];
    for i in 0..6 {
        let provider = providers[i % 3];
        let mut it = item(
            &format!("{i}"),
            &format!("AI 应用落地案例之{i}"),
            provider,
            (i as i64) * 15,
        );
        it.tags = ["AI".to_string()].into_iter().collect();
        batches[i % 3].push(it);
    }

    let sources: Vec<_> = providers
        .into_iter()
        .zip(batches)
        .map(|(name, batch)| {
            ScriptedSource::builder(name)
                .returns_items_ok(batch)
                .build()
        })
        .collect();
    let wire = wire(sources);

    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let trending: Vec<_> = result
        .items
        .iter()
        .filter(|i| i.sentiment_label() == SentimentLabel::Trending)
        .collect();
    assert_eq!(trending.len(), 1);

    let topic = trending[0];
    assert!(topic.title.contains("🔥 热门话题"));
    assert!(topic.title.contains("AI"));
    assert!((topic.relevance - 1.0).abs() < f64::EPSILON);
    assert_eq!(topic.category, "热门话题");
    // Full relevance puts the synthesised item ahead of the coverage.
    assert_eq!(result.items[0].id, topic.id);
    // The topic counts as a key tag as well.
    assert!(result.key_topics.iter().any(|(t, c)| t == "AI" && *c >= 6));
}

/// Two mentions stay below the default floor of three.
#[tokio::test]
async fn sparse_tags_do_not_trend() {
    let mut a = item("1", "AI 新产品发布", "sina", 5);
    a.tags = ["AI".to_string()].into_iter().collect();
    let mut b = item("2", "AI 行业融资动态", "sina", 20);
    b.tags = ["AI".to_string()].into_iter().collect();

    let sina = ScriptedSource::builder("sina")
        .returns_items_ok(vec![a, b])
        .build();
    let wire = wire(vec![sina]);

    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(
        result
            .items
            .iter()
            .all(|i| i.sentiment_label() != SentimentLabel::Trending)
    );
}
