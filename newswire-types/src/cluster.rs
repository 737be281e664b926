//! Cluster type produced by the similarity phase of aggregation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A group of related items. Members are referenced by id only; the engine
/// resolves them through its item index, which keeps item and cluster
/// lifetimes independent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsCluster {
    /// Cluster id.
    pub id: String,
    /// Title inherited from the centroid item.
    pub title: String,
    /// Member item ids (includes the centroid).
    pub item_ids: Vec<String>,
    /// Union of stock symbols across members.
    pub symbols: BTreeSet<String>,
    /// Id of the representative item (highest relevance, earliest publish on ties).
    pub centroid_id: String,
    /// The similarity threshold the cluster was built with.
    pub threshold: f64,
    /// Mean member relevance × log2(member count + 1).
    pub impact: f64,
}

impl NewsCluster {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_ids.len()
    }

    /// True when the cluster has no members (never produced by the engine).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty()
    }
}
