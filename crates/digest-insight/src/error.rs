use thiserror::Error;

use digest_core::error::DigestError;
use digest_vector::VectorError;

/// Errors that can occur while clustering, labeling, or summarizing.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("empty cluster: {0}")]
    EmptyCluster(String),
    #[error("label generation failed: {0}")]
    LabelGeneration(String),
    #[error("summarization failed: {0}")]
    Summarization(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("vector error: {0}")]
    Vector(#[from] VectorError),
}

impl From<InsightError> for DigestError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::EmptyCluster(_) | InsightError::Vector(_) => {
                DigestError::DegenerateInput(err.to_string())
            }
            InsightError::InvalidParams(msg) => DigestError::Config(msg),
            InsightError::LabelGeneration(msg)
            | InsightError::Summarization(msg)
            | InsightError::Upstream(msg) => DigestError::upstream("generation", msg),
        }
    }
}
