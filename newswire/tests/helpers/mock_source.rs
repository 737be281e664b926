#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use newswire::{NewsItem, NewswireError};
use newswire_core::{NewsQuery, NewsSource};

type FetchFn = dyn Fn(&NewsQuery) -> Result<Vec<NewsItem>, NewswireError> + Send + Sync;

/// In-memory source used by integration tests. Behavior is tailored per
/// test through the builder: fixed items, a closure, a forced error, or
/// artificial latency.
pub struct ScriptedSource {
    name: &'static str,
    delay: Duration,
    items: Option<Vec<NewsItem>>,
    error: Option<NewswireError>,
    fetch_fn: Option<Arc<FetchFn>>,
}

impl ScriptedSource {
    pub fn builder(name: &'static str) -> ScriptedSourceBuilder {
        ScriptedSourceBuilder {
            name,
            delay: Duration::ZERO,
            items: None,
            error: None,
            fetch_fn: None,
        }
    }
}

pub struct ScriptedSourceBuilder {
    name: &'static str,
    delay: Duration,
    items: Option<Vec<NewsItem>>,
    error: Option<NewswireError>,
    fetch_fn: Option<Arc<FetchFn>>,
}

impl ScriptedSourceBuilder {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn returns_items_ok(mut self, items: Vec<NewsItem>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn fails_with(mut self, error: NewswireError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_fetch_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&NewsQuery) -> Result<Vec<NewsItem>, NewswireError> + Send + Sync + 'static,
    {
        self.fetch_fn = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Arc<ScriptedSource> {
        Arc::new(ScriptedSource {
            name: self.name,
            delay: self.delay,
            items: self.items,
            error: self.error,
            fetch_fn: self.fetch_fn,
        })
    }
}

#[async_trait]
impl NewsSource for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(
        &self,
        query: &NewsQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<NewsItem>, NewswireError> {
        if self.delay > Duration::ZERO {
            tokio::select! {
                () = cancel.cancelled() => return Err(NewswireError::Cancelled),
                () = tokio::time::sleep(self.delay) => {}
            }
        }
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if let Some(f) = &self.fetch_fn {
            return (f)(query);
        }
        Ok(self.items.clone().unwrap_or_default())
    }
}
