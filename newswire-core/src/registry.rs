//! Source registry: configuration, rolling health, and daily metrics.
//!
//! One reader-writer lock guards the whole map; readers never block one
//! another and the lock is never held across I/O. Every mutation is a
//! best-effort in-memory update, so no registry operation returns an error.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::Utc;

use newswire_types::{SourceConfig, SourceHealth, SourceKey, SourceMetrics, SourceStatus};

/// Cool-down applied after a provider signals a rate limit.
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

const METRICS_RESET_AFTER: Duration = Duration::from_secs(24 * 3600);

/// Outcome of one fetch against a source, reported back to the registry.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The fetch returned `articles` items after `elapsed`.
    Success {
        /// Number of articles returned.
        articles: usize,
        /// Wall time of the request.
        elapsed: Duration,
    },
    /// The fetch failed with a provider or decode error.
    Error {
        /// Human-readable error message.
        msg: String,
    },
    /// The provider refused the request because of its rate limit.
    RateLimited,
}

struct SourceEntry {
    config: SourceConfig,
    health: SourceHealth,
    metrics: SourceMetrics,
    /// Monotonic stamp of the last rate-limit signal; drives the cool-down
    /// independently of wall-clock adjustments.
    rate_limited_at: Option<Instant>,
}

/// Read-only view of the registry at a point in time.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    /// Source configurations in priority order.
    pub sources: Vec<SourceConfig>,
    /// Health rows keyed by source id.
    pub healths: Vec<(SourceKey, SourceHealth)>,
    /// Daily metrics keyed by source id.
    pub metrics: Vec<(SourceKey, SourceMetrics)>,
}

/// Catalog of external news providers with health tracking and rate gating.
///
/// Instance state, not a process-wide singleton: tests and embedders run
/// multiple independent registries.
pub struct SourceRegistry {
    inner: RwLock<HashMap<SourceKey, SourceEntry>>,
    cooldown: Duration,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRegistry {
    /// Empty registry with the standard 60 s rate-limit cool-down.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cooldown(RATE_LIMIT_COOLDOWN)
    }

    /// Registry with a custom cool-down; tests shrink this to milliseconds.
    #[must_use]
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            cooldown,
        }
    }

    /// Insert or replace a source row, keeping existing health and metrics
    /// when the source is already known.
    pub fn upsert_source(&self, config: SourceConfig) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        match map.get_mut(&config.id) {
            Some(entry) => entry.config = config,
            None => {
                let key = config.id.clone();
                map.insert(
                    key,
                    SourceEntry {
                        config,
                        health: SourceHealth::default(),
                        metrics: SourceMetrics::default(),
                        rate_limited_at: None,
                    },
                );
            }
        }
    }

    /// Flip the enabled flag; unknown ids are ignored.
    pub fn set_enabled(&self, id: &SourceKey, enabled: bool) {
        let mut map = self.inner.write().expect("registry lock poisoned");
        if let Some(entry) = map.get_mut(id) {
            entry.config.enabled = enabled;
            entry.health.status = if enabled {
                SourceStatus::Active
            } else {
                SourceStatus::Inactive
            };
            entry.health.last_check = Utc::now();
        }
    }

    /// True when the id is registered.
    #[must_use]
    pub fn contains(&self, id: &SourceKey) -> bool {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    /// Enabled sources, sorted by ascending priority then id. When
    /// `requested` is non-empty the result is the intersection with it.
    #[must_use]
    pub fn list_enabled(&self, requested: &[SourceKey]) -> Vec<SourceConfig> {
        let map = self.inner.read().expect("registry lock poisoned");
        let mut out: Vec<SourceConfig> = map
            .values()
            .filter(|e| e.config.enabled)
            .filter(|e| requested.is_empty() || requested.contains(&e.config.id))
            .map(|e| e.config.clone())
            .collect();
        out.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        out
    }

    /// Whether a fetch may be issued right now. Only a recent rate-limit
    /// signal gates a source; error and inactive states do not (the caller
    /// already filtered on the enabled flag).
    #[must_use]
    pub fn may_request(&self, id: &SourceKey) -> bool {
        let map = self.inner.read().expect("registry lock poisoned");
        let Some(entry) = map.get(id) else {
            return false;
        };
        if entry.health.status != SourceStatus::RateLimited {
            return true;
        }
        match entry.rate_limited_at {
            Some(at) => at.elapsed() >= self.cooldown,
            None => true,
        }
    }

    /// Milliseconds until the source leaves its cool-down; 0 when eligible.
    #[must_use]
    pub fn retry_in_ms(&self, id: &SourceKey) -> u64 {
        let map = self.inner.read().expect("registry lock poisoned");
        map.get(id)
            .and_then(|e| {
                (e.health.status == SourceStatus::RateLimited)
                    .then_some(e.rate_limited_at)
                    .flatten()
            })
            .map_or(0, |at| {
                self.cooldown
                    .saturating_sub(at.elapsed())
                    .as_millis()
                    .try_into()
                    .unwrap_or(u64::MAX)
            })
    }

    /// Record the outcome of a fetch, updating health and daily metrics
    /// atomically. Unknown ids are ignored.
    pub fn record_outcome(&self, id: &SourceKey, outcome: &FetchOutcome) {
        let now = Utc::now();
        let mut map = self.inner.write().expect("registry lock poisoned");
        let Some(entry) = map.get_mut(id) else {
            tracing::debug!(source = %id, "outcome for unknown source dropped");
            return;
        };

        // Daily reset before applying the new sample.
        if now - entry.metrics.last_reset
            >= chrono::TimeDelta::from_std(METRICS_RESET_AFTER).expect("constant fits")
        {
            entry.metrics = SourceMetrics::default();
        }

        entry.metrics.requests += 1;
        entry.health.last_check = now;

        match outcome {
            FetchOutcome::Success { articles, elapsed } => {
                let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                entry.metrics.successes += 1;
                entry.metrics.articles += *articles as u64;
                if *articles > 0 {
                    entry.metrics.covered_requests += 1;
                }
                // Running mean over today's successful requests.
                let n = entry.metrics.successes as f64;
                entry.metrics.avg_response_ms += (ms as f64 - entry.metrics.avg_response_ms) / n;
                entry.health.status = SourceStatus::Active;
                entry.health.last_response_ms = Some(ms);
                entry.health.last_error = None;
                entry.rate_limited_at = None;
            }
            FetchOutcome::Error { msg } => {
                entry.metrics.errors += 1;
                entry.health.status = SourceStatus::Error;
                entry.health.error_count += 1;
                entry.health.last_error = Some(msg.clone());
            }
            FetchOutcome::RateLimited => {
                entry.metrics.errors += 1;
                entry.health.status = SourceStatus::RateLimited;
                entry.health.error_count += 1;
                entry.health.last_error = Some("rate limited".to_string());
                entry.rate_limited_at = Some(Instant::now());
            }
        }

        entry.health.success_rate = entry.metrics.success_rate();
    }

    /// Read-only view of every row, priority-ordered like `list_enabled`.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let map = self.inner.read().expect("registry lock poisoned");
        let mut entries: Vec<&SourceEntry> = map.values().collect();
        entries.sort_by(|a, b| {
            a.config
                .priority
                .cmp(&b.config.priority)
                .then_with(|| a.config.id.cmp(&b.config.id))
        });
        RegistrySnapshot {
            sources: entries.iter().map(|e| e.config.clone()).collect(),
            healths: entries
                .iter()
                .map(|e| (e.config.id.clone(), e.health.clone()))
                .collect(),
            metrics: entries
                .iter()
                .map(|e| (e.config.id.clone(), e.metrics.clone()))
                .collect(),
        }
    }

    /// Priority of a source; `u32::MAX` for unknown ids so unknowns lose
    /// every dedup tie-break.
    #[must_use]
    pub fn priority_of(&self, id: &SourceKey) -> u32 {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .get(id)
            .map_or(u32::MAX, |e| e.config.priority)
    }
}
