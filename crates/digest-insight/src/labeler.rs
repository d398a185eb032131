//! Short descriptive labels for clusters.

use std::sync::Arc;

use tracing::debug;

use crate::error::InsightError;
use crate::generation::{GenerationRequest, Purpose, TextGenerator};

pub const LABEL_INSTRUCTION: &str = "You are a news editor. Given the headlines of related \
articles, write an explicit, descriptive title of 4 to 5 words for their main theme, suitable \
as a newspaper section heading. Reply with the title only.";

/// Produces a label for a cluster from its member titles.
#[derive(Clone)]
pub struct Labeler {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
    temperature: f32,
}

impl Labeler {
    pub fn new(generator: Arc<dyn TextGenerator>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            generator,
            max_tokens,
            temperature,
        }
    }

    /// Generate a label from `titles`.
    ///
    /// Fails with [`InsightError::EmptyCluster`] when there are no non-blank
    /// titles and with [`InsightError::LabelGeneration`] when the backend
    /// fails or returns nothing usable.
    pub async fn label<S: AsRef<str>>(&self, titles: &[S]) -> Result<String, InsightError> {
        let titles: Vec<&str> = titles
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();
        if titles.is_empty() {
            return Err(InsightError::EmptyCluster(
                "no titles to label".to_string(),
            ));
        }

        let request = GenerationRequest {
            purpose: Purpose::Label,
            instruction: LABEL_INSTRUCTION.to_string(),
            content: titles.join("\n"),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let raw = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| InsightError::LabelGeneration(e.to_string()))?;

        let label = clean_label(&raw);
        if label.is_empty() {
            return Err(InsightError::LabelGeneration(
                "generator returned an empty label".to_string(),
            ));
        }
        debug!(titles = titles.len(), label = %label, "Cluster labeled");
        Ok(label)
    }
}

/// First non-empty line, without surrounding quotes, markdown emphasis, or
/// a trailing period.
fn clean_label(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    line.trim_start_matches('#')
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '_' | '`' | '«' | '»'))
        .trim()
        .trim_end_matches('.')
        .trim()
        .to_string()
}
