//! The source trait implemented by provider crates.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use newswire_types::{NewsItem, NewswireError, SourceKey};

/// Parameters of a single fetch against one source.
#[derive(Debug, Clone, Default)]
pub struct NewsQuery {
    /// Stock symbol to filter for; empty means no symbol filtering.
    pub symbol: String,
    /// Lookback window in days.
    pub days: u32,
    /// Soft cap on returned items; sources may return fewer.
    pub limit: usize,
    /// Optional category restriction.
    pub category: Option<String>,
}

impl NewsQuery {
    /// Query for a symbol over a day window with the default item cap.
    #[must_use]
    pub fn symbol(symbol: impl Into<String>, days: u32) -> Self {
        Self {
            symbol: symbol.into(),
            days,
            limit: 50,
            category: None,
        }
    }
}

/// Connector trait implemented by each external news provider.
///
/// Implementations normalise the provider's native schema to [`NewsItem`]:
/// ids are `"<name>_<native-id>"`, unparseable publish times clamp to one
/// minute in the past, and items are filtered to the query symbol when one
/// is supplied. Cancellation must abort an in-flight HTTP request.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Stable identifier used as the registry key and the item-id prefix.
    fn name(&self) -> &'static str;

    /// Canonical source key constructed from the static name.
    fn key(&self) -> SourceKey {
        SourceKey::new(self.name())
    }

    /// Default category applied to items the provider does not label.
    fn category(&self) -> &str {
        "财经"
    }

    /// Fetch and normalise items for the query.
    async fn fetch(
        &self,
        query: &NewsQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<NewsItem>, NewswireError>;
}
