//! Content-based similarity clustering.

use std::collections::HashSet;

use newswire_types::{NewsCluster, NewsItem};

use crate::text;

/// Knobs for one clustering pass.
#[derive(Debug, Clone)]
pub struct ClusterParams {
    /// Content-Jaccard threshold at or above which a pair is edged.
    pub threshold: f64,
    /// Maximum publish-time distance for a pair to be considered.
    pub window: std::time::Duration,
    /// Component size cap; larger components split into adjacent shards.
    pub max_size: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            window: std::time::Duration::from_secs(3600),
            max_size: 5,
        }
    }
}

/// The text used for similarity: the body when present, else summary, else
/// the title. Keeps forum posts with empty bodies clusterable.
fn content_of(item: &NewsItem) -> &str {
    if !item.body.is_empty() {
        &item.body
    } else if !item.summary.is_empty() {
        &item.summary
    } else {
        &item.title
    }
}

/// Group related items into clusters.
///
/// Builds an undirected graph with edges between pairs whose publish times
/// fall within `params.window` and whose content-token Jaccard reaches
/// `params.threshold`, then extracts connected components. Components larger
/// than `params.max_size` are split into adjacent shards along publish
/// order. Only components of two or more members materialise a cluster:
/// centroid is the highest-relevance member (earliest publish on ties),
/// the cluster inherits its title, symbols are the member union, and
/// impact = mean relevance × log2(member count + 1).
///
/// Member ordering inside each cluster follows publish time, so the output
/// is invariant under input permutation. Cluster ids are derived from the
/// centroid id.
#[must_use]
pub fn build_clusters(items: &[NewsItem], params: &ClusterParams) -> Vec<NewsCluster> {
    let n = items.len();
    if n < 2 {
        return Vec::new();
    }

    let window = chrono::TimeDelta::from_std(params.window).unwrap_or(chrono::TimeDelta::zero());
    let token_sets: Vec<HashSet<String>> =
        items.iter().map(|i| text::tokens(content_of(i))).collect();

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            let gap = (items[i].published_at - items[j].published_at).abs();
            if gap > window {
                continue;
            }
            if text::jaccard(&token_sets[i], &token_sets[j]) >= params.threshold {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }

    // Connected components via BFS.
    let mut seen = vec![false; n];
    let mut components: Vec<Vec<usize>> = Vec::new();
    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut queue = vec![start];
        let mut comp = Vec::new();
        while let Some(v) = queue.pop() {
            comp.push(v);
            for &w in &adj[v] {
                if !seen[w] {
                    seen[w] = true;
                    queue.push(w);
                }
            }
        }
        if comp.len() >= 2 {
            components.push(comp);
        }
    }

    let mut clusters = Vec::new();
    for mut comp in components {
        // Publish order makes sharding and member lists deterministic.
        comp.sort_by(|&a, &b| {
            items[a]
                .published_at
                .cmp(&items[b].published_at)
                .then_with(|| items[a].id.cmp(&items[b].id))
        });
        for shard in comp.chunks(params.max_size.max(2)) {
            if shard.len() < 2 {
                continue;
            }
            clusters.push(materialize(items, shard, params.threshold));
        }
    }

    // Stable output order across permutations of the input.
    clusters.sort_by(|a, b| a.centroid_id.cmp(&b.centroid_id));
    clusters
}

fn materialize(items: &[NewsItem], member_idx: &[usize], threshold: f64) -> NewsCluster {
    let centroid = member_idx
        .iter()
        .copied()
        .min_by(|&a, &b| {
            items[b]
                .relevance
                .partial_cmp(&items[a].relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| items[a].published_at.cmp(&items[b].published_at))
                .then_with(|| items[a].id.cmp(&items[b].id))
        })
        .expect("shards are non-empty");

    let mean_relevance =
        member_idx.iter().map(|&i| items[i].relevance).sum::<f64>() / member_idx.len() as f64;
    let impact = mean_relevance * ((member_idx.len() + 1) as f64).log2();

    NewsCluster {
        id: format!("cluster_{}", items[centroid].id),
        title: items[centroid].title.clone(),
        item_ids: member_idx.iter().map(|&i| items[i].id.clone()).collect(),
        symbols: member_idx
            .iter()
            .flat_map(|&i| items[i].symbols.iter().cloned())
            .collect(),
        centroid_id: items[centroid].id.clone(),
        threshold,
        impact,
    }
}
