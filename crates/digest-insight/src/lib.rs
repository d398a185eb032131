//! Digest Insight crate - clustering, labeling, summarization, and digests.
//!
//! Provides the analysis half of the news pipeline:
//! - Category-aware DBSCAN clustering with outlier reassignment
//! - Token-budgeted chunking
//! - Cluster labels and recursive summaries over a pluggable text generator
//! - Per-run digest reports

pub mod chunker;
pub mod cluster;
pub mod dbscan;
pub mod digest;
pub mod error;
pub mod extractive;
pub mod generation;
pub mod labeler;
pub mod summarizer;
pub mod types;

#[cfg(feature = "hf-tokenizer")]
pub use chunker::HfTokenCounter;
pub use chunker::{chunk_by_tokens, ApproxTokenCounter, TokenCounter};
pub use cluster::ClusterEngine;
pub use digest::{DigestEntry, DigestReport};
pub use error::InsightError;
pub use generation::{
    ExtractiveGenerator, GenerationRequest, OpenAiGenerator, Purpose, TextGenerator,
};
pub use labeler::Labeler;
pub use summarizer::{ClusterSummary, Summarizer, SummarizerSettings};
pub use types::{
    Cluster, ClusterIndex, ClusterKey, ClusterOutcome, ClusterStats, LabeledCluster,
    SummarizedCluster,
};
