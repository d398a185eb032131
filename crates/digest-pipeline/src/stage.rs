//! Pipeline stages with validated transitions.
//!
//! A run moves strictly forward:
//! Start -> Scraped -> Indexed -> Clustered -> Labeled -> Summarized -> Done

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Run lifecycle stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Scraped,
    Indexed,
    Clustered,
    Labeled,
    Summarized,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Start,
        Stage::Scraped,
        Stage::Indexed,
        Stage::Clustered,
        Stage::Labeled,
        Stage::Summarized,
        Stage::Done,
    ];

    pub fn is_terminal(self) -> bool {
        self == Stage::Done
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Start => write!(f, "start"),
            Stage::Scraped => write!(f, "scraped"),
            Stage::Indexed => write!(f, "indexed"),
            Stage::Clustered => write!(f, "clustered"),
            Stage::Labeled => write!(f, "labeled"),
            Stage::Summarized => write!(f, "summarized"),
            Stage::Done => write!(f, "done"),
        }
    }
}

/// Validate that a stage transition is allowed.
///
/// Only the single forward step from each stage is valid; `Done` has no
/// successor.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), PipelineError> {
    let valid = matches!(
        (from, to),
        (Stage::Start, Stage::Scraped)
            | (Stage::Scraped, Stage::Indexed)
            | (Stage::Indexed, Stage::Clustered)
            | (Stage::Clustered, Stage::Labeled)
            | (Stage::Labeled, Stage::Summarized)
            | (Stage::Summarized, Stage::Done)
    );

    if valid {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransition(from, to))
    }
}
