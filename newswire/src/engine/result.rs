//! Aggregated result composition.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use newswire_core::calendar::{self, Trend};
use newswire_types::{
    AggregationConfig, NewsCluster, NewsItem, NewswireError, SentimentLabel,
};

/// One source's failure inside an otherwise-successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailure {
    /// Source id.
    pub source: String,
    /// What went wrong.
    pub error: NewswireError,
}

/// Sentiment rollup over the aggregated items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Item counts per label.
    pub counts: BTreeMap<SentimentLabel, usize>,
    /// Majority label; ties fall back to neutral.
    pub overall: SentimentLabel,
    /// Mean per-item score.
    pub score: f64,
    /// Sign of the slope of daily mean score across the day window.
    pub trend: Trend,
}

/// The composed output of one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Requested stock symbol.
    pub symbol: String,
    /// Requested day window.
    pub days: u32,
    /// Aggregated items: deduplicated, trending items appended, sorted by
    /// relevance then recency.
    pub items: Vec<NewsItem>,
    /// Clusters materialised by this run.
    pub clusters: Vec<NewsCluster>,
    /// suppressed item id → surviving item id for this run.
    pub suppressed: HashMap<String, String>,
    /// Sentiment rollup.
    pub sentiment: SentimentSummary,
    /// Top tag frequencies, descending.
    pub key_topics: Vec<(String, usize)>,
    /// Titles of the leading items.
    pub top_headlines: Vec<String>,
    /// Item counts per source.
    pub by_source: BTreeMap<String, usize>,
    /// Per-source failures tolerated by the fan-out.
    pub errors: Vec<SourceFailure>,
    /// `1 − error fraction`, clamped to `[0, 1]`.
    pub confidence: f64,
    /// Composition stamp.
    pub generated_at: DateTime<Utc>,
}

pub(crate) struct ComposeInput {
    pub symbol: String,
    pub days: u32,
    pub items: Vec<NewsItem>,
    pub clusters: Vec<NewsCluster>,
    pub suppressed: HashMap<String, String>,
    pub errors: Vec<SourceFailure>,
    pub attempted: usize,
    pub now: DateTime<Utc>,
}

pub(crate) fn compose(input: ComposeInput, cfg: &AggregationConfig) -> AggregatedResult {
    let ComposeInput {
        symbol,
        days,
        items,
        clusters,
        suppressed,
        errors,
        attempted,
        now,
    } = input;

    let mut counts: BTreeMap<SentimentLabel, usize> = BTreeMap::new();
    for item in &items {
        *counts.entry(item.sentiment_label()).or_default() += 1;
    }

    let overall = {
        let max = counts.values().copied().max().unwrap_or(0);
        let mut leaders = counts.iter().filter(|(_, &c)| c == max && max > 0);
        match (leaders.next(), leaders.next()) {
            (Some((&label, _)), None) => label,
            _ => SentimentLabel::Neutral,
        }
    };

    let score = if items.is_empty() {
        0.0
    } else {
        items.iter().map(NewsItem::sentiment_score).sum::<f64>() / items.len() as f64
    };

    // Daily mean score in the configured zone feeds the slope sign.
    let mut per_day: BTreeMap<chrono::NaiveDate, (f64, usize)> = BTreeMap::new();
    for item in &items {
        let day = calendar::local_day(item.published_at, cfg.tz);
        let slot = per_day.entry(day).or_insert((0.0, 0));
        slot.0 += item.sentiment_score();
        slot.1 += 1;
    }
    let points: Vec<(chrono::NaiveDate, f64)> = per_day
        .into_iter()
        .map(|(day, (sum, n))| (day, sum / n as f64))
        .collect();
    let trend = calendar::daily_trend(&points);

    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for item in &items {
        for tag in &item.tags {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    let mut key_topics: Vec<(String, usize)> = tag_counts
        .into_iter()
        .map(|(t, c)| (t.to_string(), c))
        .collect();
    key_topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    key_topics.truncate(10);

    let top_headlines = items
        .iter()
        .take(cfg.top_headlines)
        .map(|i| i.title.clone())
        .collect();

    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    for item in &items {
        *by_source.entry(item.source.clone()).or_default() += 1;
    }

    let confidence = if attempted == 0 {
        1.0
    } else {
        (1.0 - errors.len() as f64 / attempted as f64).clamp(0.0, 1.0)
    };

    AggregatedResult {
        symbol,
        days,
        items,
        clusters,
        suppressed,
        sentiment: SentimentSummary {
            counts,
            overall,
            score,
            trend,
        },
        key_topics,
        top_headlines,
        by_source,
        errors,
        confidence,
        generated_at: now,
    }
}
