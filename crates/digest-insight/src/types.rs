use std::fmt;

use serde::{Deserialize, Serialize};

use digest_core::types::Article;

/// Position of a cluster within its category.
///
/// `Numbered` groups come out of density clustering. `Sentinel` is the
/// per-category fallback group: categories too small to cluster, noise
/// articles that were not moved elsewhere, articles moved in from other
/// categories, and articles without a usable embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClusterIndex {
    Numbered(usize),
    Sentinel,
}

impl fmt::Display for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterIndex::Numbered(n) => write!(f, "#{}", n),
            ClusterIndex::Sentinel => write!(f, "sentinel"),
        }
    }
}

/// Identity of a cluster within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterKey {
    pub category: String,
    pub index: ClusterIndex,
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.index)
    }
}

/// A group of topically similar articles.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub key: ClusterKey,
    pub members: Vec<Article>,
}

impl Cluster {
    pub fn category(&self) -> &str {
        &self.key.category
    }

    pub fn titles(&self) -> Vec<&str> {
        self.members
            .iter()
            .map(|a| a.title.trim())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn links(&self) -> Vec<String> {
        self.members.iter().map(|a| a.link.clone()).collect()
    }
}

/// A cluster with its generated label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledCluster {
    pub cluster: Cluster,
    pub label: String,
    /// True when generation failed and the category name was used.
    pub fallback: bool,
}

/// A labeled cluster with its final summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizedCluster {
    pub key: ClusterKey,
    pub label: String,
    pub summary: String,
    pub links: Vec<String>,
}

/// Counters describing one clustering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterStats {
    pub categories: usize,
    /// Articles placed in a numbered cluster.
    pub clustered: usize,
    /// Noise articles found by density clustering.
    pub isolated: usize,
    /// Noise articles moved into another category.
    pub reassigned: usize,
    /// Articles without a usable embedding.
    pub unembedded: usize,
}

/// Output of [`crate::cluster::ClusterEngine::cluster`].
#[derive(Debug, Clone, Default)]
pub struct ClusterOutcome {
    pub clusters: Vec<Cluster>,
    pub stats: ClusterStats,
}
