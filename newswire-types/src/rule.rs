//! Declarative aggregation rules applied by the engine in priority order.

use serde::{Deserialize, Serialize};

/// The three aggregation rule families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Title-based duplicate suppression.
    Duplicate,
    /// Content-based similarity clustering.
    Similar,
    /// Trending-topic synthesis over tags and symbols.
    Trending,
}

/// Which duplicate survives when a pair is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    /// Keep the item from the source with the smallest priority number.
    #[default]
    HighestPriority,
}

/// A single declarative rule.
///
/// Unset knobs fall back to the engine's [`AggregationConfig`] defaults, so a
/// rule usually only states what it overrides.
///
/// [`AggregationConfig`]: crate::AggregationConfig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRule {
    /// Stable rule id.
    pub id: String,
    /// Rule family.
    pub kind: RuleKind,
    /// Disabled rules are skipped without reordering the rest.
    pub enabled: bool,
    /// Application order; ascending.
    pub priority: u32,
    /// Similarity threshold override (duplicate/similar rules).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Sliding publish-time window override, seconds (similar/trending rules).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<u64>,
    /// Cluster size cap override (similar rules).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_size: Option<usize>,
    /// Distinct-article floor override (trending rules).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_articles: Option<usize>,
    /// Survivor policy (duplicate rules).
    #[serde(default)]
    pub keep: KeepPolicy,
}

impl AggregationRule {
    /// A rule of the given kind with everything else at defaults.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: RuleKind, priority: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: true,
            priority,
            threshold: None,
            window_secs: None,
            cluster_size: None,
            min_articles: None,
            keep: KeepPolicy::default(),
        }
    }

    /// The stock rule set: dedup, then clustering, then trending synthesis.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("dedup-title", RuleKind::Duplicate, 10),
            Self::new("cluster-content", RuleKind::Similar, 20),
            Self::new("trending-topics", RuleKind::Trending, 30),
        ]
    }
}
