//! Full-text search over articles using SQLite FTS5.

use rusqlite::Connection;

use digest_core::error::DigestError;
use digest_core::types::Article;

use crate::repository::{row_to_article, ARTICLE_COLUMNS};

/// A single full-text match.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub article: Article,
    /// BM25 relevance, negated so that higher is better.
    pub rank: f64,
}

/// Turn free text into a safe FTS5 query.
///
/// Each whitespace-separated term is double-quoted (embedded quotes are
/// doubled) so user input cannot inject FTS5 operators or column filters.
/// Terms are implicitly AND-ed.
pub fn sanitize_fts5_query(raw: &str) -> String {
    raw.split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn search_articles(
    conn: &Connection,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>, DigestError> {
    let fts_query = sanitize_fts5_query(query);
    if fts_query.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {}, rank
         FROM articles_fts
         JOIN articles a ON a.rowid = articles_fts.rowid
         WHERE articles_fts MATCH ?1
         ORDER BY rank
         LIMIT ?2",
        ARTICLE_COLUMNS
            .split(", ")
            .map(|c| format!("a.{}", c))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| DigestError::Storage(format!("FTS5 query prepare failed: {}", e)))?;

    let rows = stmt
        .query_map(rusqlite::params![fts_query, limit as i64], |row| {
            let rank: f64 = row.get(9)?;
            Ok((row_to_article(row), rank))
        })
        .map_err(|e| DigestError::Storage(format!("FTS5 query failed: {}", e)))?;

    let mut hits = Vec::new();
    for row in rows {
        let (article, rank) = row.map_err(|e| DigestError::Storage(e.to_string()))?;
        hits.push(SearchHit {
            article: article?,
            // FTS5 rank is negative (lower = better); negate for consistency.
            rank: -rank,
        });
    }
    Ok(hits)
}
