//! Brute-force similarity ranking over stored articles.

use std::cmp::Ordering;

use digest_core::types::Article;

use crate::math::cosine_similarity;

/// An article paired with its similarity to a query vector.
#[derive(Debug, Clone)]
pub struct ScoredArticle<'a> {
    pub article: &'a Article,
    pub score: f64,
}

/// Top `k` articles by cosine similarity to `query`, best first.
///
/// Articles without an embedding, or whose embedding has a different
/// dimensionality from the query, are skipped. Equal scores keep input order.
pub fn rank_by_similarity<'a>(
    query: &[f32],
    candidates: &'a [Article],
    k: usize,
) -> Vec<ScoredArticle<'a>> {
    let mut scored: Vec<ScoredArticle<'a>> = candidates
        .iter()
        .filter_map(|article| {
            let embedding = article.embedding.as_deref()?;
            if embedding.len() != query.len() {
                return None;
            }
            Some(ScoredArticle {
                article,
                score: cosine_similarity(query, embedding),
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
