//! Per-run counters.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::stage::Stage;

/// What a run did, stage by stage. Returned on success and attached to a
/// run timeout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    /// Last stage the run reached.
    pub stage: Stage,
    pub dry_run: bool,
    /// Articles newly inserted by the ingestor.
    pub ingested: usize,
    /// Articles in the window.
    pub articles: usize,
    pub embedded: usize,
    pub embedding_failures: usize,
    pub clusters: usize,
    pub label_fallbacks: usize,
    pub summaries: usize,
    pub summary_failures: usize,
    pub messages_delivered: usize,
    pub messages_failed: usize,
}

impl RunReport {
    pub fn new(window_start: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            window_start,
            stage: Stage::Start,
            dry_run,
            ingested: 0,
            articles: 0,
            embedded: 0,
            embedding_failures: 0,
            clusters: 0,
            label_fallbacks: 0,
            summaries: 0,
            summary_failures: 0,
            messages_delivered: 0,
            messages_failed: 0,
        }
    }
}

/// Shared handle to the report of a run in progress.
///
/// Stages record into it as they go, so the run-level timeout can still
/// return what was done.
#[derive(Debug, Clone)]
pub struct ReportHandle(Arc<Mutex<RunReport>>);

impl ReportHandle {
    pub fn new(report: RunReport) -> Self {
        Self(Arc::new(Mutex::new(report)))
    }

    pub fn update(&self, f: impl FnOnce(&mut RunReport)) {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    pub fn snapshot(&self) -> RunReport {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
