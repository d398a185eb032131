use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Category bucket used when an article has no (or a blank) category.
pub const UNCATEGORIZED: &str = "uncategorized";

/// A news article as persisted in the article store.
///
/// The link is the identity. The embedding is attached at most once and is
/// never overwritten afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub link: String,
    pub title: String,
    pub body: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

impl Article {
    pub fn new(
        link: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            link: link.into(),
            title: title.into(),
            body: body.into(),
            category: default_category(),
            published_at,
            source: String::new(),
            description: None,
            embedding: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Category bucket for partitioning; blank categories fall back to
    /// [`UNCATEGORIZED`].
    pub fn category_key(&self) -> &str {
        let trimmed = self.category.trim();
        if trimmed.is_empty() {
            UNCATEGORIZED
        } else {
            trimmed
        }
    }

    /// Text sent to the embedding service.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    /// Text block fed to the summarizer. Articles without a title
    /// contribute their body alone.
    pub fn summary_block(&self) -> String {
        if self.title.trim().is_empty() {
            self.body.trim().to_string()
        } else {
            format!("{}. {}", self.title, self.body)
        }
    }
}

/// Query parameters for listing articles from the store.
///
/// All fields are optional; an empty filter lists every article, oldest
/// first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleFilter {
    /// Inclusive lower bound on the publication time.
    pub published_after: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the publication time.
    pub published_before: Option<DateTime<Utc>>,
    pub category: Option<String>,
    /// Full-text query over title and body.
    pub text: Option<String>,
    /// Only articles that still lack an embedding.
    pub missing_embedding: bool,
    pub limit: Option<usize>,
}

impl ArticleFilter {
    pub fn since(published_after: DateTime<Utc>) -> Self {
        Self {
            published_after: Some(published_after),
            ..Default::default()
        }
    }
}

/// Midnight (UTC) `days` days before `now`.
///
/// A one-day window run at 09:00 covers everything since yesterday 00:00.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    midnight - Duration::days(i64::from(days))
}
