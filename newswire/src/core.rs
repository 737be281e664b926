use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use newswire_core::{NewsSource, PersistenceHooks, SourceRegistry};
use newswire_types::{
    AggregationConfig, AggregationRule, NewsCluster, NewsItem, NewswireError, SourceConfig,
    SourceHealth, SourceKey, SourceMetrics,
};

/// Orchestrator that fans requests out across registered news sources and
/// aggregates the results.
pub struct Newswire {
    pub(crate) registry: Arc<SourceRegistry>,
    pub(crate) fetchers: HashMap<SourceKey, Arc<dyn NewsSource>>,
    pub(crate) rules: RwLock<Vec<AggregationRule>>,
    pub(crate) cfg: AggregationConfig,
    pub(crate) hooks: Option<Arc<dyn PersistenceHooks>>,
    // Working set handed out by the accessor methods. Items and clusters are
    // linked by id only; the maps are never locked across I/O.
    pub(crate) items: RwLock<HashMap<String, NewsItem>>,
    pub(crate) clusters: RwLock<HashMap<String, NewsCluster>>,
    pub(crate) duplicates: RwLock<HashMap<String, String>>,
}

/// Builder for constructing a [`Newswire`] orchestrator.
pub struct NewswireBuilder {
    sources: Vec<(SourceConfig, Arc<dyn NewsSource>)>,
    rules: Vec<AggregationRule>,
    cfg: AggregationConfig,
    hooks: Option<Arc<dyn PersistenceHooks>>,
    cooldown: Option<std::time::Duration>,
}

impl Default for NewswireBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewswireBuilder {
    /// Create a new builder with the stock rule set and default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            rules: AggregationRule::defaults(),
            cfg: AggregationConfig::default(),
            hooks: None,
            cooldown: None,
        }
    }

    /// Register a source together with its registry row.
    ///
    /// The row's id must match the connector's `name()`; `build` rejects
    /// mismatches so a priority list can never point at the wrong adapter.
    #[must_use]
    pub fn with_source(mut self, config: SourceConfig, source: Arc<dyn NewsSource>) -> Self {
        self.sources.push((config, source));
        self
    }

    /// Replace the rule set.
    #[must_use]
    pub fn rules(mut self, rules: Vec<AggregationRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Add one rule on top of the current set.
    #[must_use]
    pub fn with_rule(mut self, rule: AggregationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Override the aggregation configuration.
    #[must_use]
    pub fn aggregation_config(mut self, cfg: AggregationConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Wire optional persistence hooks; failures are logged, never surfaced.
    #[must_use]
    pub fn persistence(mut self, hooks: Arc<dyn PersistenceHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Override the registry's rate-limit cool-down. Tests shrink this to
    /// milliseconds; production keeps the 60 s default.
    #[must_use]
    pub const fn rate_limit_cooldown(mut self, cooldown: std::time::Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    /// - `InvalidArg` if no sources were registered.
    /// - `InvalidArg` if a registry row's id does not match its connector's
    ///   `name()`, or the same id is registered twice.
    pub fn build(self) -> Result<Newswire, NewswireError> {
        if self.sources.is_empty() {
            return Err(NewswireError::InvalidArg(
                "no sources registered; add at least one via with_source(...)".to_string(),
            ));
        }

        let registry = match self.cooldown {
            Some(cooldown) => SourceRegistry::with_cooldown(cooldown),
            None => SourceRegistry::new(),
        };

        let mut fetchers: HashMap<SourceKey, Arc<dyn NewsSource>> = HashMap::new();
        for (config, source) in self.sources {
            if config.id != source.key() {
                return Err(NewswireError::InvalidArg(format!(
                    "source config id {:?} does not match connector name {:?}",
                    config.id.as_str(),
                    source.name()
                )));
            }
            if fetchers.contains_key(&config.id) {
                return Err(NewswireError::InvalidArg(format!(
                    "source {:?} registered twice",
                    config.id.as_str()
                )));
            }
            registry.upsert_source(config.clone());
            fetchers.insert(config.id, source);
        }

        let mut rules = self.rules;
        rules.sort_by_key(|r| r.priority);

        Ok(Newswire {
            registry: Arc::new(registry),
            fetchers,
            rules: RwLock::new(rules),
            cfg: self.cfg,
            hooks: self.hooks,
            items: RwLock::new(HashMap::new()),
            clusters: RwLock::new(HashMap::new()),
            duplicates: RwLock::new(HashMap::new()),
        })
    }
}

/// Tag an opaque error with the source it came from, leaving already-tagged
/// kinds untouched.
pub(crate) fn tag_err(source: &str, e: NewswireError) -> NewswireError {
    match e {
        e @ (NewswireError::Source { .. }
        | NewswireError::Decode { .. }
        | NewswireError::RateLimited { .. }
        | NewswireError::SourceTimeout { .. }
        | NewswireError::RequestTimeout
        | NewswireError::Cancelled
        | NewswireError::AllSourcesFailed(_)) => e,
        other => NewswireError::source(source, other.to_string()),
    }
}

impl Newswire {
    /// Start building a new `Newswire` instance.
    ///
    /// Typical usage chains source registration and configuration:
    ///
    /// ```rust,ignore
    /// let sina = Arc::new(SinaSource::from_config(&sina_cfg)?);
    /// let wire = Newswire::builder()
    ///     .with_source(sina_cfg, sina)
    ///     .build()?;
    /// let result = wire.fetch_aggregated(&AggregateRequest::symbol("000001", 1), &cancel).await?;
    /// ```
    #[must_use]
    pub fn builder() -> NewswireBuilder {
        NewswireBuilder::new()
    }

    /// The shared source registry (health tracker included).
    #[must_use]
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    /// All registered source rows, priority-ordered.
    #[must_use]
    pub fn sources(&self) -> Vec<SourceConfig> {
        self.registry.snapshot().sources
    }

    /// Health rows for every source.
    #[must_use]
    pub fn source_status(&self) -> Vec<(SourceKey, SourceHealth)> {
        self.registry.snapshot().healths
    }

    /// Daily metrics for every source.
    #[must_use]
    pub fn source_metrics(&self) -> Vec<(SourceKey, SourceMetrics)> {
        self.registry.snapshot().metrics
    }

    /// Enable or disable a source at runtime.
    pub fn set_source_enabled(&self, id: &SourceKey, enabled: bool) {
        self.registry.set_enabled(id, enabled);
    }

    /// Clusters materialised by the most recent aggregations.
    #[must_use]
    pub fn clusters(&self) -> Vec<NewsCluster> {
        let mut out: Vec<NewsCluster> = self
            .clusters
            .read()
            .expect("cluster index lock poisoned")
            .values()
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// suppressed item id → surviving item id, accumulated across runs.
    #[must_use]
    pub fn duplicates(&self) -> HashMap<String, String> {
        self.duplicates
            .read()
            .expect("duplicate index lock poisoned")
            .clone()
    }

    /// Look up an item from the current working set by id.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<NewsItem> {
        self.items
            .read()
            .expect("item index lock poisoned")
            .get(id)
            .cloned()
    }

    /// Resolve a cluster's members against the item working set.
    #[must_use]
    pub fn cluster_items(&self, cluster: &NewsCluster) -> Vec<NewsItem> {
        let items = self.items.read().expect("item index lock poisoned");
        cluster
            .item_ids
            .iter()
            .filter_map(|id| items.get(id).cloned())
            .collect()
    }

    /// Replace the rule set at runtime.
    pub fn set_rules(&self, mut rules: Vec<AggregationRule>) {
        rules.sort_by_key(|r| r.priority);
        *self.rules.write().expect("rule lock poisoned") = rules;
    }
}
