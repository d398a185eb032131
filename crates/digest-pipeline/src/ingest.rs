//! Feeding articles into the store ahead of a run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use digest_core::types::Article;
use digest_storage::ArticleStore;

use crate::error::PipelineError;

/// Counts from one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Records read from the source.
    pub read: usize,
    pub inserted: usize,
    /// Records whose link was already stored.
    pub duplicates: usize,
    /// Records without a link or title.
    pub skipped: usize,
}

/// A source of articles, run before the window is read.
#[async_trait]
pub trait ArticleIngestor: Send + Sync {
    async fn ingest(&self, store: &dyn ArticleStore) -> Result<IngestReport, PipelineError>;
}

/// One article as exported by a feed scraper.
#[derive(Debug, Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "content")]
    body: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

impl ArticleRecord {
    fn into_article(self, now: DateTime<Utc>) -> Result<Article, String> {
        let link = self
            .link
            .filter(|l| !l.trim().is_empty())
            .ok_or("missing link")?;
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or("missing title")?;
        let published_at = match self.published_at.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| format!("unreadable published_at {:?}", raw))?,
        };

        let mut article = Article::new(
            link.trim(),
            title.trim(),
            self.body.unwrap_or_default(),
            published_at,
        );
        if let Some(category) = self.category {
            article = article.with_category(category);
        }
        if let Some(source) = self.source {
            article = article.with_source(source);
        }
        article.description = self.description;
        Ok(article)
    }
}

/// RFC 3339, or a timestamp without offset read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a JSON array of article records from a file.
///
/// Accepted fields: `link`, `title`, `body` (or `content`), and optionally
/// `category`, `source`, `description`, `published_at` (RFC 3339 or a naive
/// ISO 8601 time taken as UTC, defaults to the time of ingestion). Records
/// that cannot be read are skipped; only an unreadable file fails.
#[derive(Debug, Clone)]
pub struct JsonFileIngestor {
    path: PathBuf,
}

impl JsonFileIngestor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArticleIngestor for JsonFileIngestor {
    async fn ingest(&self, store: &dyn ArticleStore) -> Result<IngestReport, PipelineError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| PipelineError::Ingest(format!("{}: {}", self.path.display(), e)))?;
        let records: Vec<serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Ingest(format!("{}: {}", self.path.display(), e)))?;

        let now = Utc::now();
        let mut report = IngestReport {
            read: records.len(),
            ..Default::default()
        };

        for (i, record) in records.into_iter().enumerate() {
            let parsed = serde_json::from_value::<ArticleRecord>(record)
                .map_err(|e| e.to_string())
                .and_then(|r| r.into_article(now));
            let article = match parsed {
                Ok(article) => article,
                Err(reason) => {
                    warn!(index = i, reason = %reason, "Skipping article record");
                    report.skipped += 1;
                    continue;
                }
            };
            if store.insert_article(&article)? {
                report.inserted += 1;
            } else {
                report.duplicates += 1;
            }
        }

        info!(
            path = %self.path.display(),
            read = report.read,
            inserted = report.inserted,
            duplicates = report.duplicates,
            skipped = report.skipped,
            "Articles ingested"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digest_storage::{ArticleRepository, Database};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn store() -> ArticleRepository {
        ArticleRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_ingest_records() {
        let file = create_temp_json(
            r#"[
                {"link": "https://a.example/1", "title": "Budget passes", "body": "The vote was close.",
                 "category": "Politics", "published_at": "2026-03-01T09:30:00Z"},
                {"link": "https://a.example/2", "title": "Storm warning", "content": "Winds up to 120km/h.",
                 "source": "Weather Desk"},
                {"link": "", "title": "No link"},
                {"link": "https://a.example/3"},
                {"link": "https://a.example/1", "title": "Budget passes again"}
            ]"#,
        );
        let store = store();
        let report = JsonFileIngestor::new(file.path())
            .ingest(&store)
            .await
            .unwrap();

        assert_eq!(
            report,
            IngestReport {
                read: 5,
                inserted: 2,
                duplicates: 1,
                skipped: 2,
            }
        );

        let first = store.get_article("https://a.example/1").unwrap().unwrap();
        assert_eq!(first.title, "Budget passes");
        assert_eq!(first.category, "Politics");
        assert_eq!(first.published_at.to_rfc3339(), "2026-03-01T09:30:00+00:00");

        let second = store.get_article("https://a.example/2").unwrap().unwrap();
        assert_eq!(second.body, "Winds up to 120km/h.");
        assert_eq!(second.source, "Weather Desk");
        assert_eq!(second.category_key(), "uncategorized");
    }

    #[tokio::test]
    async fn test_missing_file_is_ingest_error() {
        let err = JsonFileIngestor::new("/nonexistent/articles.json")
            .ingest(&store())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(_)));
    }
    #[tokio::test]
    async fn test_bad_records_are_skipped_not_fatal() {
        let file = create_temp_json(
            r#"[
                {"link": "https://a.example/naive", "title": "Bridge reopens",
                 "content": "Traffic resumed.", "published_at": "2026-03-01T10:00:00"},
                {"link": "https://a.example/frac", "title": "Rates held",
                 "published_at": "2026-03-01 07:15:30.250"},
                {"link": "https://a.example/bad", "title": "Garbled date",
                 "published_at": "yesterday-ish"},
                {"link": 42, "title": "Numeric link"}
            ]"#,
        );
        let store = store();
        let report = JsonFileIngestor::new(file.path())
            .ingest(&store)
            .await
            .unwrap();

        assert_eq!(report.read, 4);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 2);

        let naive = store.get_article("https://a.example/naive").unwrap().unwrap();
        assert_eq!(naive.published_at.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        assert!(store.get_article("https://a.example/frac").unwrap().is_some());
        assert!(store.get_article("https://a.example/bad").unwrap().is_none());
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2026-03-01T10:00:00+02:00").map(|t| t.to_rfc3339()),
            Some("2026-03-01T08:00:00+00:00".to_string())
        );
        assert_eq!(
            parse_timestamp("2026-03-01T10:00:00.5").map(|t| t.timestamp_millis() % 1000),
            Some(500)
        );
        assert!(parse_timestamp("01/03/2026").is_none());
    }

    #[tokio::test]
    async fn test_malformed_json_is_ingest_error() {
        let file = create_temp_json("{not json");
        let err = JsonFileIngestor::new(file.path())
            .ingest(&store())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(_)));
    }
}
