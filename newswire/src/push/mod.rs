//! Push delivery: subscription store, transports, sender pipeline, analytics.

pub mod analytics;
pub mod pipeline;
pub mod store;
pub mod transport;

use newswire_types::{NewsCluster, NewsItem, PushMessage, MessageKind, Priority};

/// Derive a push message from a high-impact cluster, targeting the cluster's
/// stock symbols. The centroid item supplies title and summary.
#[must_use]
pub fn message_from_cluster(cluster: &NewsCluster, centroid: &NewsItem) -> PushMessage {
    let mut msg = PushMessage::new(
        MessageKind::News,
        cluster.title.clone(),
        centroid.summary.clone(),
    );
    msg.summary = format!("{} 篇相关报道", cluster.len());
    msg.category = centroid.category.clone();
    msg.url = (!centroid.url.is_empty()).then(|| centroid.url.clone());
    msg.tags = centroid.tags.clone();
    msg.target.symbols = cluster.symbols.clone();
    msg.priority = if cluster.impact >= 2.0 {
        Priority::High
    } else {
        Priority::Medium
    };
    msg
}
