//! Optional persistence seam.
//!
//! Collaborators wire these hooks to their storage layer; when absent, state
//! lives only in memory for the process lifetime. Hook failures are logged
//! and never propagated, so persistence problems cannot fail an aggregation
//! or a push.

use async_trait::async_trait;

use newswire_types::{Delivery, NewsCluster, NewsItem, NewswireError, PushAnalytics};

/// Storage hooks invoked best-effort by the engine and the push pipeline.
///
/// Every method defaults to a no-op so implementations override only the
/// tables they persist. The schema names used by collaborators are
/// `news_items`, `news_clusters`, `push_deliveries`, and `push_analytics`.
#[async_trait]
pub trait PersistenceHooks: Send + Sync {
    /// Persist a normalised item.
    async fn save_news_item(&self, _item: &NewsItem) -> Result<(), NewswireError> {
        Ok(())
    }

    /// Persist a materialised cluster.
    async fn save_cluster(&self, _cluster: &NewsCluster) -> Result<(), NewswireError> {
        Ok(())
    }

    /// Persist a delivery record after a state change.
    async fn save_delivery(&self, _delivery: &Delivery) -> Result<(), NewswireError> {
        Ok(())
    }

    /// Persist a daily analytics rollup.
    async fn save_analytics_daily(&self, _analytics: &PushAnalytics) -> Result<(), NewswireError> {
        Ok(())
    }
}

/// Run a hook future and swallow its error with a log line.
pub async fn best_effort<F>(what: &'static str, fut: F)
where
    F: Future<Output = Result<(), NewswireError>> + Send,
{
    if let Err(e) = fut.await {
        tracing::warn!(hook = what, error = %e, "persistence hook failed; continuing");
    }
}
