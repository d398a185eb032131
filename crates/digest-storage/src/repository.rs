//! SQLite-backed [`ArticleStore`] implementation.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;

use digest_core::error::DigestError;
use digest_core::types::{Article, ArticleFilter};

use crate::db::Database;
use crate::search::{sanitize_fts5_query, search_articles, SearchHit};
use crate::store::{ArticleStore, UpsertOutcome};

pub(crate) const ARTICLE_COLUMNS: &str =
    "link, title, body, category, source, description, published_at, embedding, embedding_dim";

/// Repository for news articles.
#[derive(Debug, Clone)]
pub struct ArticleRepository {
    db: Arc<Database>,
}

impl ArticleRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl ArticleStore for ArticleRepository {
    fn insert_article(&self, article: &Article) -> Result<bool, DigestError> {
        let (blob, dim) = match &article.embedding {
            Some(v) => (Some(encode_embedding(v)), Some(v.len() as i64)),
            None => (None, None),
        };
        self.db.with_conn(|conn| {
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO articles
                        (link, title, body, category, source, description, published_at, embedding, embedding_dim)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        article.link,
                        article.title,
                        article.body,
                        article.category_key(),
                        article.source,
                        article.description,
                        article.published_at.timestamp_millis(),
                        blob,
                        dim,
                    ],
                )
                .map_err(|e| DigestError::Storage(format!("Failed to insert article: {}", e)))?;
            if inserted == 0 {
                debug!(link = %article.link, "Article already stored");
            }
            Ok(inserted > 0)
        })
    }

    fn get_article(&self, link: &str) -> Result<Option<Article>, DigestError> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM articles WHERE link = ?1", ARTICLE_COLUMNS);
            let result = conn
                .query_row(&sql, rusqlite::params![link], |row| Ok(row_to_article(row)))
                .optional()
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            result.transpose()
        })
    }

    fn list_articles(&self, filter: &ArticleFilter) -> Result<Vec<Article>, DigestError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(after) = filter.published_after {
            params.push(Value::Integer(after.timestamp_millis()));
            clauses.push("published_at >= ?");
        }
        if let Some(before) = filter.published_before {
            params.push(Value::Integer(before.timestamp_millis()));
            clauses.push("published_at < ?");
        }
        if let Some(category) = &filter.category {
            params.push(Value::Text(category.clone()));
            clauses.push("category = ?");
        }
        if let Some(text) = &filter.text {
            let query = sanitize_fts5_query(text);
            if !query.is_empty() {
                params.push(Value::Text(query));
                clauses.push("rowid IN (SELECT rowid FROM articles_fts WHERE articles_fts MATCH ?)");
            }
        }
        if filter.missing_embedding {
            clauses.push("embedding IS NULL");
        }

        let mut sql = format!("SELECT {} FROM articles", ARTICLE_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY published_at ASC, link ASC");
        if let Some(limit) = filter.limit {
            params.push(Value::Integer(limit as i64));
            sql.push_str(" LIMIT ?");
        }

        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    Ok(row_to_article(row))
                })
                .map_err(|e| DigestError::Storage(e.to_string()))?;

            let mut articles = Vec::new();
            for row in rows {
                articles.push(row.map_err(|e| DigestError::Storage(e.to_string()))??);
            }
            Ok(articles)
        })
    }

    fn upsert_embedding(
        &self,
        link: &str,
        embedding: &[f32],
    ) -> Result<UpsertOutcome, DigestError> {
        let blob = encode_embedding(embedding);
        self.db.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE articles SET embedding = ?2, embedding_dim = ?3
                     WHERE link = ?1 AND embedding IS NULL",
                    rusqlite::params![link, blob, embedding.len() as i64],
                )
                .map_err(|e| DigestError::Storage(format!("Failed to store embedding: {}", e)))?;
            if updated > 0 {
                return Ok(UpsertOutcome::Stored);
            }

            let exists = conn
                .query_row(
                    "SELECT 1 FROM articles WHERE link = ?1",
                    rusqlite::params![link],
                    |_| Ok(()),
                )
                .optional()
                .map_err(|e| DigestError::Storage(e.to_string()))?
                .is_some();
            Ok(if exists {
                UpsertOutcome::AlreadyPresent
            } else {
                UpsertOutcome::UnknownArticle
            })
        })
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, DigestError> {
        self.db.with_conn(|conn| search_articles(conn, query, limit))
    }

    fn count(&self) -> Result<u64, DigestError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
                .map_err(|e| DigestError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    fn purge(&self) -> Result<usize, DigestError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM articles", [])
                .map_err(|e| DigestError::Storage(format!("Failed to purge articles: {}", e)))
        })
    }
}

/// Map a row selected with [`ARTICLE_COLUMNS`] to an [`Article`].
pub(crate) fn row_to_article(row: &Row<'_>) -> Result<Article, DigestError> {
    let get_err = |e: rusqlite::Error| DigestError::Storage(e.to_string());

    let link: String = row.get(0).map_err(get_err)?;
    let published_ts: i64 = row.get(6).map_err(get_err)?;
    let blob: Option<Vec<u8>> = row.get(7).map_err(get_err)?;
    let embedding = blob.map(|b| decode_embedding(&b)).transpose()?;

    Ok(Article {
        title: row.get(1).map_err(get_err)?,
        body: row.get(2).map_err(get_err)?,
        category: row.get(3).map_err(get_err)?,
        source: row.get(4).map_err(get_err)?,
        description: row.get(5).map_err(get_err)?,
        published_at: millis_to_utc(published_ts),
        embedding,
        link,
    })
}

/// `published_at` is stored as unix milliseconds.
fn millis_to_utc(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

/// Little-endian f32 encoding used for the `embedding` column.
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, DigestError> {
    if bytes.len() % 4 != 0 {
        return Err(DigestError::Storage(format!(
            "Corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
