use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use newswire_core::{NewsQuery, NewsSource};
use newswire_types::{NewsItem, NewswireError};

mod fixtures;

/// Mock source for CI-safe examples. Provides deterministic data from static
/// fixtures and scripted failure behavior keyed on magic symbols.
pub struct MockSource {
    name: &'static str,
    delay: std::time::Duration,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: "newswire-mock",
            delay: std::time::Duration::ZERO,
        }
    }

    /// A mock with a custom registry name, so examples can register several.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            delay: std::time::Duration::ZERO,
        }
    }

    /// Add artificial latency before responding.
    #[must_use]
    pub const fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    fn maybe_fail(&self, symbol: &str) -> Result<(), NewswireError> {
        match symbol {
            "FAIL" => Err(NewswireError::source(
                self.name,
                "forced failure: fetch".to_string(),
            )),
            "RATELIMIT" => Err(NewswireError::RateLimited {
                source: self.name.to_string(),
                retry_in_ms: 60_000,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl NewsSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> &str {
        "财经"
    }

    async fn fetch(
        &self,
        query: &NewsQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<NewsItem>, NewswireError> {
        if self.delay > std::time::Duration::ZERO {
            tokio::select! {
                () = cancel.cancelled() => return Err(NewswireError::Cancelled),
                () = tokio::time::sleep(self.delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(NewswireError::Cancelled);
        }
        self.maybe_fail(&query.symbol)?;

        let mut items = fixtures::items_for(self.name, &query.symbol);
        items.truncate(query.limit.max(1));
        Ok(items)
    }
}
