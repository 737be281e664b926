//! Phase A fan-out and Phase B rule-driven aggregation.

pub(crate) mod result;
mod util;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

pub use util::{collapse_errors, join_with_deadline};

use newswire_core::cluster::{ClusterParams, build_clusters};
use newswire_core::dedup::{DedupParams, dedup_by_title};
use newswire_core::trending::{TrendingParams, synthesize_trending};
use newswire_core::{FetchOutcome, NewsQuery, persist};
use newswire_types::{
    NewsCluster, NewsItem, NewswireError, RuleKind, SourceKey,
};

use crate::core::{Newswire, tag_err};
use result::{AggregatedResult, ComposeInput, SourceFailure};

/// Parameters of one aggregation call.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    /// Stock symbol to aggregate for; must be non-empty.
    pub symbol: String,
    /// Lookback window in days; clamped to at least one.
    pub days: u32,
    /// Restrict the fan-out to these source ids; empty means all enabled.
    pub sources: Vec<SourceKey>,
    /// Restrict merged items to these categories; empty means all.
    pub categories: Vec<String>,
}

impl AggregateRequest {
    /// Request covering all enabled sources and categories.
    #[must_use]
    pub fn symbol(symbol: impl Into<String>, days: u32) -> Self {
        Self {
            symbol: symbol.into(),
            days,
            sources: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Restrict the fan-out to the named sources.
    #[must_use]
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(|s| SourceKey::new(s)).collect();
        self
    }

    /// Restrict merged items to the named categories.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }
}

impl Newswire {
    /// Fan out to the enabled sources, merge their items, and run the
    /// rule-driven aggregation pipeline over the merged list.
    ///
    /// Individual source failures never fail the call; they are collected
    /// into the result's error summary. The call fails only when every
    /// attempted source errored and zero items came back, when the overall
    /// deadline elapses, or when `cancel` fires.
    ///
    /// # Errors
    /// `InvalidArg` (empty symbol, unknown requested source id),
    /// `AllSourcesFailed`, `RequestTimeout`, `Cancelled`.
    pub async fn fetch_aggregated(
        &self,
        req: &AggregateRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregatedResult, NewswireError> {
        let symbol = req.symbol.trim();
        if symbol.is_empty() {
            return Err(NewswireError::InvalidArg(
                "stock symbol must not be empty".to_string(),
            ));
        }
        for key in &req.sources {
            if !self.registry.contains(key) {
                return Err(NewswireError::InvalidArg(format!(
                    "unknown source id {:?}",
                    key.as_str()
                )));
            }
        }
        let days = req.days.max(1);

        let enabled = self.registry.list_enabled(&req.sources);
        let query = NewsQuery {
            symbol: symbol.to_string(),
            days,
            limit: 50,
            category: None,
        };

        // Phase A: one task per eligible source; no worker pool. Sources in
        // cool-down are skipped up front and reported as rate-limit errors.
        let mut errors: Vec<SourceFailure> = Vec::new();
        let mut attempted = 0usize;
        let mut tasks = Vec::new();
        for config in &enabled {
            let Some(fetcher) = self.fetchers.get(&config.id) else {
                continue;
            };
            attempted += 1;
            if !self.registry.may_request(&config.id) {
                errors.push(SourceFailure {
                    source: config.id.to_string(),
                    error: NewswireError::RateLimited {
                        source: config.id.to_string(),
                        retry_in_ms: self.registry.retry_in_ms(&config.id),
                    },
                });
                continue;
            }

            let fetcher = Arc::clone(fetcher);
            let registry = Arc::clone(&self.registry);
            let key = config.id.clone();
            let query = query.clone();
            let cancel = cancel.clone();
            let timeout = self.cfg.adapter_timeout;
            tasks.push(async move {
                let started = Instant::now();
                let res = match tokio::time::timeout(timeout, fetcher.fetch(&query, &cancel)).await
                {
                    Ok(r) => r,
                    Err(_) => Err(NewswireError::source_timeout(key.as_str())),
                };
                match &res {
                    Ok(items) => registry.record_outcome(
                        &key,
                        &FetchOutcome::Success {
                            articles: items.len(),
                            elapsed: started.elapsed(),
                        },
                    ),
                    // A cancelled fetch has no meaningful outcome to record.
                    Err(NewswireError::Cancelled) => {}
                    Err(NewswireError::RateLimited { .. }) => {
                        registry.record_outcome(&key, &FetchOutcome::RateLimited);
                    }
                    Err(e) => registry.record_outcome(
                        &key,
                        &FetchOutcome::Error { msg: e.to_string() },
                    ),
                }
                (key, res)
            });
        }

        let joined = join_with_deadline(tasks, Some(self.cfg.overall_timeout));
        let settled = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(NewswireError::Cancelled),
            r = joined => r?,
        };

        let now = Utc::now();
        let cutoff = now - chrono::TimeDelta::days(i64::from(days));
        let mut items: Vec<NewsItem> = Vec::new();
        for (key, res) in settled {
            match res {
                Ok(batch) => {
                    items.extend(batch.into_iter().filter(|i| i.published_at >= cutoff));
                }
                Err(NewswireError::Cancelled) => return Err(NewswireError::Cancelled),
                Err(e) => {
                    tracing::warn!(source = %key, error = %e, "source failed during fan-out");
                    errors.push(SourceFailure {
                        source: key.to_string(),
                        error: tag_err(key.as_str(), e),
                    });
                }
            }
        }
        if !req.categories.is_empty() {
            items.retain(|i| req.categories.contains(&i.category));
        }

        if items.is_empty() && !errors.is_empty() {
            return Err(collapse_errors(
                attempted > 0,
                errors.into_iter().map(|f| f.error).collect(),
            ));
        }

        // Phase B: enabled rules in ascending priority over the merged list.
        let rules = {
            let guard = self.rules.read().expect("rule lock poisoned");
            guard.iter().filter(|r| r.enabled).cloned().collect::<Vec<_>>()
        };

        let mut clusters_run: Vec<NewsCluster> = Vec::new();
        let mut suppressed_run: HashMap<String, String> = HashMap::new();
        for rule in &rules {
            match rule.kind {
                RuleKind::Duplicate => {
                    let registry = Arc::clone(&self.registry);
                    let params = DedupParams {
                        threshold: rule.threshold.unwrap_or(self.cfg.dedup_threshold),
                    };
                    let outcome = dedup_by_title(
                        std::mem::take(&mut items),
                        &move |k| registry.priority_of(k),
                        &params,
                    );
                    items = outcome.items;
                    suppressed_run.extend(outcome.suppressed);
                }
                RuleKind::Similar => {
                    let params = ClusterParams {
                        threshold: rule.threshold.unwrap_or(self.cfg.cluster_threshold),
                        window: rule
                            .window_secs
                            .map_or(self.cfg.cluster_window, std::time::Duration::from_secs),
                        max_size: rule.cluster_size.unwrap_or(self.cfg.cluster_max_size),
                    };
                    clusters_run.extend(build_clusters(&items, &params));
                }
                RuleKind::Trending => {
                    let params = TrendingParams {
                        min_articles: rule.min_articles.unwrap_or(self.cfg.trending_min_articles),
                        window: rule
                            .window_secs
                            .map_or(self.cfg.trending_window, std::time::Duration::from_secs),
                    };
                    let synthesized = synthesize_trending(&items, now, &params);
                    items.extend(synthesized);
                }
            }
        }

        items.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.published_at.cmp(&a.published_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        // Swap the run's output into the working-set indexes. Each index has
        // a single writer section and is never held across an await.
        {
            let mut idx = self.items.write().expect("item index lock poisoned");
            for item in &items {
                idx.insert(item.id.clone(), item.clone());
            }
        }
        {
            let mut idx = self.clusters.write().expect("cluster index lock poisoned");
            for cluster in &clusters_run {
                idx.insert(cluster.id.clone(), cluster.clone());
            }
        }
        {
            let mut idx = self
                .duplicates
                .write()
                .expect("duplicate index lock poisoned");
            idx.extend(suppressed_run.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        if let Some(hooks) = &self.hooks {
            for item in &items {
                persist::best_effort("save_news_item", hooks.save_news_item(item)).await;
            }
            for cluster in &clusters_run {
                persist::best_effort("save_cluster", hooks.save_cluster(cluster)).await;
            }
        }

        tracing::info!(
            symbol,
            items = items.len(),
            clusters = clusters_run.len(),
            suppressed = suppressed_run.len(),
            failed_sources = errors.len(),
            "aggregation complete"
        );

        Ok(result::compose(
            ComposeInput {
                symbol: symbol.to_string(),
                days,
                items,
                clusters: clusters_run,
                suppressed: suppressed_run,
                errors,
                attempted,
                now,
            },
            &self.cfg,
        ))
    }
}
