//! Normalised news article types shared by sources and the aggregation engine.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment polarity label attached to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    /// Positive tone.
    Positive,
    /// Negative tone.
    Negative,
    /// Neutral or unknown tone.
    Neutral,
    /// Synthetic label carried by trending-topic items.
    Trending,
}

/// Sentiment annotation for a news item.
///
/// `score` lives in `[-1, 1]`, `confidence` in `[0, 1]`. Sources that do not
/// supply sentiment get the neutral default from [`Sentiment::neutral`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Polarity label.
    pub label: SentimentLabel,
    /// Signed polarity score in `[-1, 1]`.
    pub score: f64,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f64,
    /// Optional per-emotion score breakdown.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub emotions: BTreeMap<String, f64>,
}

impl Sentiment {
    /// The default annotation for sources without native sentiment:
    /// neutral, score 0, confidence 0.6.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.0,
            confidence: 0.6,
            emotions: BTreeMap::new(),
        }
    }
}

/// A normalised article produced by a source adapter.
///
/// Identity: `id` is `"<source>_<native-id>"` and is globally unique across
/// sources. `published_at` never exceeds the fetch wall clock by more than a
/// small skew; adapters clamp unparseable timestamps to one minute in the past.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Stable id, `"<source>_<native-id>"`.
    pub id: String,
    /// Headline.
    pub title: String,
    /// Short summary, possibly empty.
    #[serde(default)]
    pub summary: String,
    /// Full body text, possibly empty.
    #[serde(default)]
    pub body: String,
    /// Id of the source that produced the item.
    pub source: String,
    /// Author or publisher byline.
    #[serde(default)]
    pub author: String,
    /// Canonical article URL.
    #[serde(default)]
    pub url: String,
    /// Publish timestamp, UTC.
    pub published_at: DateTime<Utc>,
    /// Category label (source-native or the registry category fallback).
    pub category: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Relevance in `[0, 1]`; 0.7 for forum-style sources, 0.8 for news sites.
    pub relevance: f64,
    /// Stock symbols the item mentions.
    #[serde(default)]
    pub symbols: BTreeSet<String>,
    /// Optional sentiment annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl NewsItem {
    /// Convenience constructor filling bookkeeping timestamps with `now`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            body: String::new(),
            source: source.into(),
            author: String::new(),
            url: String::new(),
            published_at,
            category: String::new(),
            tags: BTreeSet::new(),
            relevance: 0.0,
            symbols: BTreeSet::new(),
            sentiment: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The sentiment label, defaulting to neutral when unannotated.
    #[must_use]
    pub fn sentiment_label(&self) -> SentimentLabel {
        self.sentiment
            .as_ref()
            .map_or(SentimentLabel::Neutral, |s| s.label)
    }

    /// The sentiment score, defaulting to 0 when unannotated.
    #[must_use]
    pub fn sentiment_score(&self) -> f64 {
        self.sentiment.as_ref().map_or(0.0, |s| s.score)
    }
}
