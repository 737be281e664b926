//! Source registry row types: configuration, rolling health, daily metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed key identifying a source in registry and priority configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceKey(pub String);

impl SourceKey {
    /// Construct a new typed source key.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Registry row describing an external news provider.
///
/// Loaded at startup and mutable through the registry's admin operations; a
/// disabled source is skipped by aggregation but retained in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable source id (used as the item-id prefix).
    pub id: SourceKey,
    /// Human-friendly display name.
    pub name: String,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Optional credential (API key or token).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
    /// Whether aggregation may use this source.
    pub enabled: bool,
    /// Maximum requests per minute the provider tolerates.
    pub rate_limit_per_minute: u32,
    /// Priority; lower wins on dedup tie-breaks.
    pub priority: u32,
    /// Category tag for the source ("财经" etc.), the normalisation fallback.
    pub category: String,
    /// Fixed request headers sent with every call.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Default query parameters merged into every call.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl SourceConfig {
    /// Minimal enabled config for a source id; tests and examples fill the rest.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: u32) -> Self {
        Self {
            id: SourceKey::new(id),
            name: String::new(),
            base_url: String::new(),
            credential: None,
            enabled: true,
            rate_limit_per_minute: 60,
            priority,
            category: String::new(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
        }
    }
}

/// Rolling health status of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Healthy and eligible.
    #[default]
    Active,
    /// Administratively disabled or never used.
    Inactive,
    /// Refused by the provider's rate limit; eligible again after cool-down.
    RateLimited,
    /// Last request errored.
    Error,
}

/// Mutable health sidecar for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHealth {
    /// Current status.
    pub status: SourceStatus,
    /// Wall-clock stamp of the last status update.
    pub last_check: DateTime<Utc>,
    /// Cumulative error count since process start.
    pub error_count: u64,
    /// Rolling success rate; 1.0 when no requests were made yet.
    pub success_rate: f64,
    /// Response time of the last successful request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response_ms: Option<u64>,
    /// Message of the last error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Default for SourceHealth {
    fn default() -> Self {
        Self {
            status: SourceStatus::Active,
            last_check: Utc::now(),
            error_count: 0,
            success_rate: 1.0,
            last_response_ms: None,
            last_error: None,
        }
    }
}

/// Daily counters for a source, reset when `last_reset` ages past 24 h.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetrics {
    /// Requests issued today.
    pub requests: u64,
    /// Successful requests today.
    pub successes: u64,
    /// Failed requests today.
    pub errors: u64,
    /// Articles fetched today.
    pub articles: u64,
    /// Requests today that returned at least one article.
    pub covered_requests: u64,
    /// Mean response time across today's successful requests.
    pub avg_response_ms: f64,
    /// Stamp of the last daily reset.
    pub last_reset: DateTime<Utc>,
}

impl Default for SourceMetrics {
    fn default() -> Self {
        Self {
            requests: 0,
            successes: 0,
            errors: 0,
            articles: 0,
            covered_requests: 0,
            avg_response_ms: 0.0,
            last_reset: Utc::now(),
        }
    }
}

impl SourceMetrics {
    /// Success rate for the current day; 1.0 when no requests were made.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            1.0
        } else {
            self.successes as f64 / self.requests as f64
        }
    }

    /// Fraction of today's requests that produced articles; 0 before the
    /// first request.
    #[must_use]
    pub fn coverage(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.covered_requests as f64 / self.requests as f64
        }
    }
}
