//! Configuration types shared across the engine and the push pipeline.

use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Exponential backoff configuration for push retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds.
    pub start_ms: u64,
    /// Delay ceiling in milliseconds.
    pub cap_ms: u64,
    /// Multiplier applied after each failed attempt (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            start_ms: 1_000,
            cap_ms: 60_000,
            factor: 2,
            jitter_percent: 0,
        }
    }
}

/// Knobs for the aggregation engine.
///
/// Rule-level overrides win over these defaults; see
/// [`AggregationRule`](crate::AggregationRule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Per-source fetch timeout.
    pub adapter_timeout: Duration,
    /// Whole-aggregation deadline.
    pub overall_timeout: Duration,
    /// Title-Jaccard threshold for duplicate suppression.
    pub dedup_threshold: f64,
    /// Content-Jaccard threshold for clustering.
    pub cluster_threshold: f64,
    /// Sliding publish-time window for cluster edges.
    pub cluster_window: Duration,
    /// Cluster size cap; larger components split into adjacent shards.
    pub cluster_max_size: usize,
    /// Distinct-article floor for a trending topic.
    pub trending_min_articles: usize,
    /// Lookback window for trending topics.
    pub trending_window: Duration,
    /// Headline count in the composed result.
    pub top_headlines: usize,
    /// Zone used for sentiment-trend day bucketing.
    pub tz: Tz,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(60),
            dedup_threshold: 0.9,
            cluster_threshold: 0.7,
            cluster_window: Duration::from_secs(3600),
            cluster_max_size: 5,
            trending_min_articles: 3,
            trending_window: Duration::from_secs(2 * 3600),
            top_headlines: 10,
            tz: chrono_tz::Asia::Shanghai,
        }
    }
}

/// Knobs for the push delivery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Size of the sender worker pool.
    pub sender_workers: usize,
    /// Transport attempts before a delivery is recorded failed.
    pub max_attempts: u32,
    /// Retry backoff shape.
    pub retry: BackoffConfig,
    /// Per-send transport timeout.
    pub transport_timeout: Duration,
    /// Global gate for high-priority messages piercing quiet hours.
    pub quiet_hours_urgent_override: bool,
    /// Zone for daily-cap day boundaries and analytics rollups when the
    /// subscription does not carry its own.
    pub tz: Tz,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            sender_workers: 8,
            max_attempts: 5,
            retry: BackoffConfig::default(),
            transport_timeout: Duration::from_secs(10),
            quiet_hours_urgent_override: true,
            tz: chrono_tz::Asia::Shanghai,
        }
    }
}
