//! Category-aware clustering with outlier reassignment.
//!
//! Articles are partitioned by category; each category large enough is
//! clustered with DBSCAN over cosine distance. Noise articles are then moved
//! into the sentinel group of the closest other category (by average cosine
//! distance) when that category is close enough, and otherwise fall back to
//! their own category's sentinel group.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use digest_core::config::ClusteringConfig;
use digest_core::types::Article;
use digest_vector::{average_distance, l2_norm};

use crate::dbscan::dbscan;
use crate::error::InsightError;
use crate::types::{Cluster, ClusterIndex, ClusterKey, ClusterOutcome, ClusterStats};

/// Clusters one run's articles. Parameters are fixed at construction.
#[derive(Debug, Clone)]
pub struct ClusterEngine {
    params: ClusteringConfig,
}

/// One category's members and which of them carry a usable embedding.
struct CategoryPartition {
    name: String,
    members: Vec<Article>,
    /// Indices into `members` with a usable embedding.
    valid: Vec<usize>,
}

impl CategoryPartition {
    fn embeddings(&self) -> impl Iterator<Item = &[f32]> {
        self.valid
            .iter()
            .filter_map(|&i| self.members[i].embedding.as_deref())
    }
}

/// Where a single article ends up.
enum Placement {
    Own(ClusterIndex),
    Moved(String),
}

impl ClusterEngine {
    pub fn new(params: ClusteringConfig) -> Result<Self, InsightError> {
        params
            .validate()
            .map_err(|e| InsightError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ClusteringConfig {
        &self.params
    }

    /// Partition `articles` into clusters.
    ///
    /// Every input article appears in exactly one output cluster. Output is
    /// ordered by category name, then numbered clusters by id, then the
    /// category's sentinel cluster. Empty sentinel clusters are omitted.
    pub fn cluster(&self, articles: Vec<Article>) -> Result<ClusterOutcome, InsightError> {
        let dimension = reference_dimension(&articles);
        let partitions = partition(articles, dimension);
        let min_samples = self.params.min_samples;

        let mut stats = ClusterStats {
            categories: partitions.len(),
            ..Default::default()
        };

        // Density clustering, per category.
        let mut placements: Vec<Vec<Placement>> = Vec::with_capacity(partitions.len());
        let mut isolated: Vec<(usize, usize)> = Vec::new();

        for (ci, part) in partitions.iter().enumerate() {
            let mut placed: Vec<Placement> = (0..part.members.len())
                .map(|_| Placement::Own(ClusterIndex::Sentinel))
                .collect();
            stats.unembedded += part.members.len() - part.valid.len();

            if part.valid.len() < min_samples {
                debug!(
                    category = %part.name,
                    members = part.members.len(),
                    embedded = part.valid.len(),
                    "Category below min_samples, single sentinel cluster"
                );
                placements.push(placed);
                continue;
            }

            let points: Vec<&[f32]> = part.embeddings().collect();
            let labels = dbscan(&points, self.params.eps, min_samples)?;
            for (&member, label) in part.valid.iter().zip(labels) {
                match label {
                    Some(id) => {
                        placed[member] = Placement::Own(ClusterIndex::Numbered(id));
                        stats.clustered += 1;
                    }
                    None => isolated.push((ci, member)),
                }
            }
            debug!(
                category = %part.name,
                embedded = part.valid.len(),
                "Density clustering done"
            );
            placements.push(placed);
        }
        stats.isolated = isolated.len();

        // Reassignment of noise articles against the unmodified partition.
        let eligible: Vec<usize> = partitions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.valid.len() >= min_samples)
            .map(|(i, _)| i)
            .collect();

        for (ci, member) in isolated {
            let Some(embedding) = partitions[ci].members[member].embedding.as_deref() else {
                continue;
            };
            let mut best: Option<(usize, f64)> = None;
            for &other in eligible.iter().filter(|&&o| o != ci) {
                let avg = average_distance(embedding, partitions[other].embeddings())?;
                if best.map_or(true, |(_, d)| avg < d) {
                    best = Some((other, avg));
                }
            }

            if let Some((target, distance)) = best {
                if distance < self.params.reassign_threshold {
                    debug!(
                        link = %partitions[ci].members[member].link,
                        from = %partitions[ci].name,
                        to = %partitions[target].name,
                        distance,
                        "Isolated article reassigned"
                    );
                    placements[ci][member] = Placement::Moved(partitions[target].name.clone());
                    stats.reassigned += 1;
                }
            }
        }

        let clusters = assemble(partitions, placements);

        info!(
            clusters = clusters.len(),
            categories = stats.categories,
            clustered = stats.clustered,
            isolated = stats.isolated,
            reassigned = stats.reassigned,
            unembedded = stats.unembedded,
            "Clustering complete"
        );

        Ok(ClusterOutcome { clusters, stats })
    }
}

/// Most common length among non-zero embeddings. On a tie the length seen
/// last wins, so the newest articles set the dimension.
fn reference_dimension(articles: &[Article]) -> Option<usize> {
    let mut counts: HashMap<usize, (usize, usize)> = HashMap::new();
    for (position, embedding) in articles
        .iter()
        .filter_map(|a| a.embedding.as_deref())
        .filter(|e| !e.is_empty() && l2_norm(e) > 0.0)
        .enumerate()
    {
        let entry = counts.entry(embedding.len()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = position;
    }
    counts
        .into_iter()
        .max_by_key(|&(_, rank)| rank)
        .map(|(len, _)| len)
}

fn partition(articles: Vec<Article>, dimension: Option<usize>) -> Vec<CategoryPartition> {
    let mut by_category: BTreeMap<String, Vec<Article>> = BTreeMap::new();
    for article in articles {
        by_category
            .entry(article.category_key().to_string())
            .or_default()
            .push(article);
    }

    by_category
        .into_iter()
        .map(|(name, members)| {
            let valid = members
                .iter()
                .enumerate()
                .filter(|(_, a)| is_usable(a.embedding.as_deref(), dimension))
                .map(|(i, _)| i)
                .collect();
            CategoryPartition {
                name,
                members,
                valid,
            }
        })
        .collect()
}

fn is_usable(embedding: Option<&[f32]>, dimension: Option<usize>) -> bool {
    match (embedding, dimension) {
        (Some(e), Some(dim)) => e.len() == dim && l2_norm(e) > 0.0,
        _ => false,
    }
}

/// Turn per-article placements into ordered clusters. Articles moved into
/// another category follow that category's own sentinel members.
fn assemble(partitions: Vec<CategoryPartition>, placements: Vec<Vec<Placement>>) -> Vec<Cluster> {
    let mut groups: BTreeMap<ClusterKey, Vec<Article>> = BTreeMap::new();
    let mut moved: Vec<(ClusterKey, Article)> = Vec::new();

    for (part, placed) in partitions.into_iter().zip(placements) {
        for (article, placement) in part.members.into_iter().zip(placed) {
            match placement {
                Placement::Own(index) => groups
                    .entry(ClusterKey {
                        category: part.name.clone(),
                        index,
                    })
                    .or_default()
                    .push(article),
                Placement::Moved(target) => moved.push((
                    ClusterKey {
                        category: target,
                        index: ClusterIndex::Sentinel,
                    },
                    article,
                )),
            }
        }
    }
    for (key, article) in moved {
        groups.entry(key).or_default().push(article);
    }

    groups
        .into_iter()
        .filter(|(_, members)| !members.is_empty())
        .map(|(key, members)| Cluster { key, members })
        .collect()
}
