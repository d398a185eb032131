//! The article store contract consumed by the pipeline.

use chrono::{DateTime, Utc};

use digest_core::error::DigestError;
use digest_core::types::{Article, ArticleFilter};

use crate::search::SearchHit;

/// Result of attaching an embedding to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The embedding was written.
    Stored,
    /// The article already had an embedding; nothing was written.
    AlreadyPresent,
    /// No article with that link exists.
    UnknownArticle,
}

/// Durable article storage.
///
/// Implementations must be safe to share across tasks. Embedding writes are
/// at-most-once per article: an existing embedding is never overwritten.
pub trait ArticleStore: Send + Sync {
    /// Insert an article unless one with the same link exists.
    ///
    /// Returns `true` when a row was inserted.
    fn insert_article(&self, article: &Article) -> Result<bool, DigestError>;

    fn get_article(&self, link: &str) -> Result<Option<Article>, DigestError>;

    fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, DigestError>;

    /// Articles published at or after `since`, oldest first.
    fn list_articles_since(&self, since: DateTime<Utc>) -> Result<Vec<Article>, DigestError> {
        self.list_articles(&ArticleFilter::since(since))
    }

    /// Attach an embedding if the article has none yet.
    fn upsert_embedding(&self, link: &str, embedding: &[f32])
        -> Result<UpsertOutcome, DigestError>;

    /// Full-text search over title and body, best match first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DigestError>;

    fn count(&self) -> Result<u64, DigestError>;

    /// Delete every article. Returns the number of rows removed.
    fn purge(&self) -> Result<usize, DigestError>;
}
