//! Trending-topic synthesis over tags and stock symbols.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use newswire_types::{NewsItem, Sentiment, SentimentLabel};

/// Knobs for one trending pass.
#[derive(Debug, Clone)]
pub struct TrendingParams {
    /// Distinct items a topic needs inside the window.
    pub min_articles: usize,
    /// Lookback window anchored at `now`.
    pub window: std::time::Duration,
}

impl Default for TrendingParams {
    fn default() -> Self {
        Self {
            min_articles: 3,
            window: std::time::Duration::from_secs(2 * 3600),
        }
    }
}

/// Scan tags and symbols across `items` and synthesise one item per topic
/// that at least `params.min_articles` distinct items mention within the
/// window. Synthetic items carry relevance 1.0, the trending sentiment
/// label, and the symbol union of their members.
#[must_use]
pub fn synthesize_trending(
    items: &[NewsItem],
    now: DateTime<Utc>,
    params: &TrendingParams,
) -> Vec<NewsItem> {
    let window = chrono::TimeDelta::from_std(params.window).unwrap_or(chrono::TimeDelta::zero());
    let cutoff = now - window;

    // topic → indexes of distinct items mentioning it. BTreeMap keeps the
    // synthesis order stable across runs.
    let mut topics: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, item) in items.iter().enumerate() {
        if item.published_at < cutoff || item.published_at > now {
            continue;
        }
        // Skip previously synthesised items so repeated passes stay stable.
        if item.sentiment_label() == SentimentLabel::Trending {
            continue;
        }
        for topic in item.tags.iter().chain(item.symbols.iter()) {
            let entry = topics.entry(topic.clone()).or_default();
            if entry.last() != Some(&idx) {
                entry.push(idx);
            }
        }
    }

    let hours = params.window.as_secs() / 3600;
    let mut out = Vec::new();
    for (topic, members) in topics {
        if members.len() < params.min_articles {
            continue;
        }

        let symbols: BTreeSet<String> = members
            .iter()
            .flat_map(|&i| items[i].symbols.iter().cloned())
            .collect();

        let mut item = NewsItem::new(
            format!("trending_{topic}"),
            format!("🔥 热门话题：{topic}"),
            "trending",
            now,
        );
        item.summary = format!("最近 {hours} 小时内有 {} 篇相关报道", members.len());
        item.category = "热门话题".to_string();
        item.relevance = 1.0;
        item.symbols = symbols;
        item.tags = [topic].into_iter().collect();
        item.sentiment = Some(Sentiment {
            label: SentimentLabel::Trending,
            score: 0.0,
            confidence: 0.8,
            emotions: BTreeMap::new(),
        });
        out.push(item);
    }
    out
}
