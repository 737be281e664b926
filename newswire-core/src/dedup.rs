//! Title-based duplicate suppression.

use std::collections::{HashMap, HashSet};

use newswire_types::{NewsItem, SourceKey};

use crate::text;

/// Knobs for one dedup pass.
#[derive(Debug, Clone)]
pub struct DedupParams {
    /// Title-Jaccard threshold at or above which a pair counts as duplicate.
    pub threshold: f64,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self { threshold: 0.9 }
    }
}

/// Result of a dedup pass.
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// Surviving items, input order preserved, survivor tags merged.
    pub items: Vec<NewsItem>,
    /// suppressed item id → surviving item id.
    pub suppressed: HashMap<String, String>,
}

/// Suppress near-identical titles, keeping one survivor per duplicate group.
///
/// Duplicate pairs are transitive: pairwise matches are merged into groups
/// via union-find. The survivor is the member from the source with the
/// smallest priority number; ties break on earlier publish time, then
/// lexicographic id, which makes the outcome invariant under input
/// permutation. Tags of suppressed members are folded into the survivor.
#[must_use]
pub fn dedup_by_title(
    items: Vec<NewsItem>,
    priority_of: &dyn Fn(&SourceKey) -> u32,
    params: &DedupParams,
) -> DedupOutcome {
    let n = items.len();
    if n < 2 {
        return DedupOutcome {
            items,
            suppressed: HashMap::new(),
        };
    }

    let token_sets: Vec<HashSet<String>> = items.iter().map(|i| text::tokens(&i.title)).collect();

    let mut dsu = Dsu::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if text::jaccard(&token_sets[i], &token_sets[j]) >= params.threshold {
                dsu.union(i, j);
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..n {
        groups.entry(dsu.find(i)).or_default().push(i);
    }

    let mut survivor_of: HashMap<usize, usize> = HashMap::new();
    let mut suppressed = HashMap::new();
    for members in groups.values() {
        let &best = members
            .iter()
            .min_by(|&&a, &&b| {
                let ia = &items[a];
                let ib = &items[b];
                priority_of(&SourceKey::new(ia.source.clone()))
                    .cmp(&priority_of(&SourceKey::new(ib.source.clone())))
                    .then_with(|| ia.published_at.cmp(&ib.published_at))
                    .then_with(|| ia.id.cmp(&ib.id))
            })
            .expect("groups are non-empty");
        for &m in members {
            if m != best {
                suppressed.insert(items[m].id.clone(), items[best].id.clone());
            }
            survivor_of.insert(m, best);
        }
    }

    // Fold suppressed tags into survivors before dropping them.
    let mut merged_tags: HashMap<usize, Vec<String>> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        let best = survivor_of[&idx];
        if best != idx {
            merged_tags
                .entry(best)
                .or_default()
                .extend(item.tags.iter().cloned());
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (idx, mut item) in items.into_iter().enumerate() {
        if survivor_of[&idx] != idx {
            continue;
        }
        if let Some(extra) = merged_tags.remove(&idx) {
            item.tags.extend(extra);
        }
        out.push(item);
    }

    DedupOutcome {
        items: out,
        suppressed,
    }
}

struct Dsu {
    parent: Vec<usize>,
}

impl Dsu {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}
