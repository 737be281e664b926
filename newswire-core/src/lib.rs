//! Core contracts and algorithms for the newswire ecosystem.
//!
//! Overview
//! - Defines the [`NewsSource`] trait implemented by provider crates.
//! - Owns the [`SourceRegistry`]: per-source configuration, rolling health,
//!   rate-limit gating, and daily metrics behind one reader-writer lock.
//! - Hosts the pure aggregation algorithms (title dedup, content clustering,
//!   trending-topic synthesis) so orchestrators stay thin and the algorithms
//!   stay independently testable.
//! - Provides the optional [`PersistenceHooks`] seam; hook failures are
//!   logged and never propagated.
#![warn(missing_docs)]

pub mod calendar;
pub mod cluster;
pub mod dedup;
pub mod persist;
pub mod registry;
pub mod source;
pub mod text;
pub mod trending;

pub use newswire_types as types;

pub use newswire_types::{
    AggregationConfig, AggregationRule, BackoffConfig, KeepPolicy, NewsCluster, NewsItem,
    NewswireError, PushConfig, RuleKind, Sentiment, SentimentLabel, SourceConfig, SourceHealth,
    SourceKey, SourceMetrics, SourceStatus,
};

pub use cluster::{ClusterParams, build_clusters};
pub use dedup::{DedupOutcome, DedupParams, dedup_by_title};
pub use persist::PersistenceHooks;
pub use registry::{FetchOutcome, RegistrySnapshot, SourceRegistry};
pub use source::{NewsQuery, NewsSource};
pub use trending::{TrendingParams, synthesize_trending};
