use thiserror::Error;

use digest_core::error::DigestError;

use crate::report::RunReport;
use crate::stage::Stage;

/// Errors that abort a pipeline run.
///
/// Per-item failures (one embedding, one label, one summary, one message)
/// never surface here; they are logged and counted in the [`RunReport`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Store error: {0}")]
    Store(#[from] DigestError),

    #[error("Run timed out after {secs}s at stage {}", .report.stage)]
    Timeout { secs: u64, report: Box<RunReport> },

    #[error("Invalid stage transition: {0} -> {1}")]
    InvalidTransition(Stage, Stage),

    #[error("Clustering failed: {0}")]
    Clustering(String),

    #[error("Ingestion failed: {0}")]
    Ingest(String),

    #[error("Invalid pipeline configuration: {0}")]
    Config(String),
}

impl PipelineError {
    /// The partial report of a timed-out run.
    pub fn partial_report(&self) -> Option<&RunReport> {
        match self {
            PipelineError::Timeout { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

impl From<PipelineError> for DigestError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Store(e) => e,
            PipelineError::Timeout { secs, .. } => DigestError::Timeout { secs },
            PipelineError::Config(msg) => DigestError::Config(msg),
            other => DigestError::Pipeline(other.to_string()),
        }
    }
}
