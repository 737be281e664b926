//! Aggregates against the real provider endpoints. Needs network access;
//! run the mock-backed examples for CI-safe demos.

use std::sync::Arc;

use newswire::{AggregateRequest, Newswire, SourceConfig};
use newswire_sources::{EastmoneySource, SinaSource, TencentSource, XueqiuSource};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut sina_cfg = SourceConfig::new("sina", 1);
    sina_cfg.name = "新浪财经".to_string();
    let mut tencent_cfg = SourceConfig::new("tencent", 2);
    tencent_cfg.name = "腾讯财经".to_string();
    let mut xueqiu_cfg = SourceConfig::new("xueqiu", 3);
    xueqiu_cfg.name = "雪球".to_string();
    xueqiu_cfg.credential = std::env::var("XUEQIU_TOKEN").ok();
    let mut eastmoney_cfg = SourceConfig::new("eastmoney", 4);
    eastmoney_cfg.name = "东方财富".to_string();

    let wire = Newswire::builder()
        .with_source(sina_cfg.clone(), Arc::new(SinaSource::from_config(&sina_cfg)?))
        .with_source(
            tencent_cfg.clone(),
            Arc::new(TencentSource::from_config(&tencent_cfg)?),
        )
        .with_source(
            xueqiu_cfg.clone(),
            Arc::new(XueqiuSource::from_config(&xueqiu_cfg)?),
        )
        .with_source(
            eastmoney_cfg.clone(),
            Arc::new(EastmoneySource::from_config(&eastmoney_cfg)?),
        )
        .build()?;

    let symbol = std::env::args().nth(1).unwrap_or_else(|| "000001".to_string());
    println!("aggregating 3 days of news for {symbol}...");

    let result = wire
        .fetch_aggregated(
            &AggregateRequest::symbol(symbol, 3),
            &CancellationToken::new(),
        )
        .await?;

    println!(
        "{} items, {} clusters, {} suppressed duplicates, confidence {:.2}",
        result.items.len(),
        result.clusters.len(),
        result.suppressed.len(),
        result.confidence
    );
    for (source, count) in &result.by_source {
        println!("  {source}: {count}");
    }
    for failure in &result.errors {
        eprintln!("  {} failed: {}", failure.source, failure.error);
    }

    Ok(())
}
