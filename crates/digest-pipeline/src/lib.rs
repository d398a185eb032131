//! Digest Pipeline crate - the run orchestrator.
//!
//! A run reads the article window from the store, embeds what is missing,
//! clusters, labels, summarizes, and delivers one digest message per
//! cluster. Each stage's output is a distinct type consumed by the next.

pub mod error;
pub mod ingest;
pub mod orchestrator;
pub mod report;
pub mod stage;
pub mod stages;
pub mod timeout;

pub use error::PipelineError;
pub use ingest::{ArticleIngestor, IngestReport, JsonFileIngestor};
pub use orchestrator::{Pipeline, PipelineSettings};
pub use report::{ReportHandle, RunReport};
pub use stage::{validate_transition, Stage};
pub use stages::{Clustered, Done, Indexed, Labeled, RunContext, Scraped, Start, Summarized};
