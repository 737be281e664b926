#![allow(dead_code)]

pub mod mock_source;
pub mod transport;

use std::sync::Arc;

use chrono::Utc;

use newswire::{NewsItem, Newswire, Sentiment, SentimentLabel, SourceConfig};
use newswire_core::NewsSource as _;

pub use mock_source::ScriptedSource;
pub use transport::ScriptedTransport;

/// An item published `minutes_ago` with the given title and source prefix.
pub fn item(id: &str, title: &str, source: &str, minutes_ago: i64) -> NewsItem {
    let mut it = NewsItem::new(
        format!("{source}_{id}"),
        title,
        source,
        Utc::now() - chrono::TimeDelta::minutes(minutes_ago),
    );
    it.relevance = 0.8;
    it.category = "财经".to_string();
    it.sentiment = Some(Sentiment::neutral());
    it
}

/// Attach a sentiment score to an item.
pub fn scored(mut it: NewsItem, label: SentimentLabel, score: f64) -> NewsItem {
    it.sentiment = Some(Sentiment {
        label,
        score,
        confidence: 0.9,
        emotions: Default::default(),
    });
    it
}

/// Build an orchestrator over scripted sources, priority taken from
/// registration order (1-based).
pub fn wire(sources: Vec<Arc<ScriptedSource>>) -> Newswire {
    let mut builder = Newswire::builder();
    for (i, source) in sources.into_iter().enumerate() {
        let name = source.name();
        builder = builder.with_source(SourceConfig::new(name, (i + 1) as u32), source);
    }
    builder.build().expect("wire builds")
}
