//! Newswire-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod analytics;
mod cluster;
mod config;
mod error;
mod news;
mod push;
mod rule;
mod source;

pub use analytics::{DayStats, DeviceStats, MessageStats, PushAnalytics};
pub use cluster::NewsCluster;
pub use config::{AggregationConfig, BackoffConfig, PushConfig};
pub use error::NewswireError;
pub use news::{NewsItem, Sentiment, SentimentLabel};
pub use push::{
    AckEvent, ChannelPrefs, Delivery, DeliveryStatus, DeviceKind, Frequency, MessageKind,
    Priority, PushMessage, PushTarget, QuietHours, Subscription,
};
pub use rule::{AggregationRule, KeepPolicy, RuleKind};
pub use source::{SourceConfig, SourceHealth, SourceKey, SourceMetrics, SourceStatus};
