//! Typed stage outputs. Each step of the run consumes its predecessor's
//! output by value and produces the next one.

use chrono::{DateTime, Utc};

use digest_core::types::Article;
use digest_insight::{Cluster, ClusterStats, DigestReport, LabeledCluster, SummarizedCluster};

use crate::report::{ReportHandle, RunReport};

/// Carried by every stage output.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub window_start: DateTime<Utc>,
    pub report: ReportHandle,
}

#[derive(Debug, Clone)]
pub struct Start {
    pub ctx: RunContext,
}

impl Start {
    pub fn new(window_start: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            ctx: RunContext {
                window_start,
                report: ReportHandle::new(RunReport::new(window_start, dry_run)),
            },
        }
    }
}

/// Articles in the window, as read from the store.
#[derive(Debug, Clone)]
pub struct Scraped {
    pub ctx: RunContext,
    pub articles: Vec<Article>,
}

/// Articles in the window after embedding the missing ones.
#[derive(Debug, Clone)]
pub struct Indexed {
    pub ctx: RunContext,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone)]
pub struct Clustered {
    pub ctx: RunContext,
    pub clusters: Vec<Cluster>,
    pub stats: ClusterStats,
}

#[derive(Debug, Clone)]
pub struct Labeled {
    pub ctx: RunContext,
    pub clusters: Vec<LabeledCluster>,
}

#[derive(Debug, Clone)]
pub struct Summarized {
    pub ctx: RunContext,
    pub clusters: Vec<SummarizedCluster>,
}

/// Terminal state of a run.
#[derive(Debug, Clone)]
pub struct Done {
    pub result: String,
    pub digest: DigestReport,
    pub report: RunReport,
}
