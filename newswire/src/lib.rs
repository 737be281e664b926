//! Newswire aggregates news from multiple external providers and delivers
//! push notifications to subscribed devices.
//!
//! Overview
//! - Fans out concurrent fetches across registered [`NewsSource`] connectors,
//!   gated by the registry's per-source rate-limit health.
//! - Merges responses, then applies rule-driven aggregation: title dedup,
//!   content clustering, and trending-topic synthesis.
//! - Routes push messages to subscribed connections with per-subscription
//!   preference matching, quiet hours, daily caps, and delivery accounting.
//!
//! Key behaviors and trade-offs
//! - Fan-out: one task per enabled source with no worker pool; the provider
//!   count is small and a pool would only serialise providers and stretch
//!   tail latency. Individual source failures never fail the request; only
//!   a fully-failed fan-out surfaces `AllSourcesFailed`.
//! - Rate limiting: a source that signalled a rate limit is skipped for a
//!   cool-down interval and becomes eligible again without intervention.
//! - Push ordering: deliveries to one recipient transmit in message-creation
//!   order; across recipients the sender pool provides no ordering.
//! - Retry: transient transport failures back off exponentially up to a
//!   capped attempt budget; permanent failures deactivate the subscription.
//!
//! Examples
//! - Basic aggregation: see `./examples/01_aggregate.rs`.
//! - Push round-trip: see `./examples/02_push_roundtrip.rs`.
#![warn(missing_docs)]

pub(crate) mod core;
mod engine;
pub mod push;

pub use crate::core::{Newswire, NewswireBuilder};
pub use engine::result::{AggregatedResult, SentimentSummary, SourceFailure};
pub use engine::{AggregateRequest, collapse_errors, join_with_deadline};
pub use push::analytics::compute_analytics;
pub use push::pipeline::{PushService, PushServiceBuilder};
pub use push::store::SubscriptionStore;
pub use push::transport::{
    GatewayTransport, PushTransport, RenderedMessage, ServerPushTransport, StreamTransport,
    TransportError,
};

pub use newswire_core::{
    FetchOutcome, NewsQuery, NewsSource, PersistenceHooks, RegistrySnapshot, SourceRegistry,
    calendar::Trend,
};

// Re-export core types for convenience
pub use newswire_types::{
    AckEvent,
    AggregationConfig,
    AggregationRule,
    BackoffConfig,
    ChannelPrefs,
    Delivery,
    DeliveryStatus,
    DeviceKind,
    Frequency,
    KeepPolicy,
    MessageKind,
    NewsCluster,
    NewsItem,
    NewswireError,
    Priority,
    PushAnalytics,
    PushConfig,
    PushMessage,
    PushTarget,
    QuietHours,
    RuleKind,
    Sentiment,
    SentimentLabel,
    SourceConfig,
    SourceHealth,
    SourceKey,
    SourceMetrics,
    SourceStatus,
    Subscription,
};
