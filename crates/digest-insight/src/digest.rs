//! Per-run news digest.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SummarizedCluster;

/// One summarized cluster as it appears in the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub category: String,
    pub label: String,
    pub summary: String,
    pub article_count: usize,
    pub links: Vec<String>,
}

impl DigestEntry {
    /// Header line followed by the summary.
    pub fn render(&self) -> String {
        format!("🌍 {} - {}\n{}", self.category, self.label, self.summary.trim())
    }
}

/// The digest produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub entries: Vec<DigestEntry>,
}

impl DigestReport {
    /// Build a report from summarized clusters, keeping their order.
    pub fn new(window_start: DateTime<Utc>, clusters: &[SummarizedCluster]) -> Self {
        let entries = clusters
            .iter()
            .map(|c| DigestEntry {
                category: c.key.category.clone(),
                label: c.label.clone(),
                summary: c.summary.clone(),
                article_count: c.links.len(),
                links: c.links.clone(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            window_start,
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn article_count(&self) -> usize {
        self.entries.iter().map(|e| e.article_count).sum()
    }

    /// One message per entry, ready for the notification sink.
    pub fn render_messages(&self) -> Vec<String> {
        self.entries.iter().map(DigestEntry::render).collect()
    }

    /// Structured form of the report with a per-category breakdown.
    pub fn to_json(&self) -> serde_json::Value {
        let category_breakdown: BTreeMap<&str, serde_json::Value> = self
            .entries
            .iter()
            .fold(BTreeMap::new(), |mut acc: BTreeMap<&str, (usize, usize)>, e| {
                let slot = acc.entry(e.category.as_str()).or_insert((0, 0));
                slot.0 += 1;
                slot.1 += e.article_count;
                acc
            })
            .into_iter()
            .map(|(category, (clusters, articles))| {
                (
                    category,
                    serde_json::json!({"clusters": clusters, "articles": articles}),
                )
            })
            .collect();

        serde_json::json!({
            "id": self.id.to_string(),
            "generated_at": self.generated_at.to_rfc3339(),
            "window_start": self.window_start.to_rfc3339(),
            "cluster_count": self.entries.len(),
            "article_count": self.article_count(),
            "category_breakdown": category_breakdown,
            "entries": self.entries.iter().map(|e| {
                serde_json::json!({
                    "category": e.category,
                    "label": e.label,
                    "summary": e.summary,
                    "article_count": e.article_count,
                    "links": e.links,
                })
            }).collect::<Vec<_>>(),
        })
    }
}
