//! Vector math, embedding services, and similarity ranking.

pub mod embedding;
pub mod error;
pub mod math;
pub mod similarity;

pub use embedding::{DynEmbeddingService, EmbeddingService, MockEmbedding, OpenAiEmbedding};
pub use error::VectorError;
pub use math::{average_distance, cosine_distance, cosine_similarity, l2_norm};
pub use similarity::{rank_by_similarity, ScoredArticle};
