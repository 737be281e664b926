use std::sync::Arc;

use newswire::{AggregateRequest, Newswire, SourceConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Register two deterministic sources (CI-safe; no network).
    let sina = Arc::new(newswire_mock::MockSource::named("sina"));
    let tencent = Arc::new(newswire_mock::MockSource::named("tencent"));

    let wire = Newswire::builder()
        .with_source(SourceConfig::new("sina", 1), sina)
        .with_source(SourceConfig::new("tencent", 2), tencent)
        .build()?;

    // 2. Aggregate one day of news for a symbol.
    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol("000001", 1),
            &CancellationToken::new(),
        )
        .await?;

    // 3. Inspect the composed result.
    println!("{} items from {} sources", result.items.len(), result.by_source.len());
    for headline in &result.top_headlines {
        println!("  - {headline}");
    }
    println!(
        "sentiment: {:?} (score {:.2}, trend {})",
        result.sentiment.overall, result.sentiment.score, result.sentiment.trend
    );
    println!("confidence: {:.2}", result.confidence);

    Ok(())
}
