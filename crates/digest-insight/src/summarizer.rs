//! Hierarchical cluster summaries under a token budget.
//!
//! Article blocks are chunked to fit one request each and summarized into
//! intermediate summaries. While the intermediate summaries together still
//! exceed the budget they are chunked and summarized again, up to
//! `max_reduction_depth` rounds. A final pass over what remains always
//! produces exactly one summary.

use std::sync::Arc;

use tracing::debug;

use digest_core::types::Article;

use crate::chunker::{chunk_by_tokens, TokenCounter};
use crate::error::InsightError;
use crate::generation::{GenerationRequest, Purpose, TextGenerator};

pub const SUMMARY_INSTRUCTION: &str = "You are an expert news editor. Summarize the following \
articles as a clear, concise digest of bullet points covering the key facts.";

const BLOCK_SEPARATOR: &str = "\n\n";

/// Budget and sampling settings for the summarizer.
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub max_chunk_tokens: usize,
    pub max_reduction_depth: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 14_000,
            max_reduction_depth: 4,
            max_tokens: 1_024,
            temperature: 0.2,
        }
    }
}

/// A cluster's final summary and how it was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub text: String,
    /// Summaries produced by the first (per-chunk) pass.
    pub intermediate: usize,
    /// Extra reduction rounds between the first pass and the final pass.
    pub rounds: usize,
    /// Total generation calls.
    pub calls: usize,
}

#[derive(Clone)]
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    counter: Arc<dyn TokenCounter>,
    settings: SummarizerSettings,
}

impl Summarizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        counter: Arc<dyn TokenCounter>,
        settings: SummarizerSettings,
    ) -> Self {
        Self {
            generator,
            counter,
            settings,
        }
    }

    /// Summarize a cluster's articles from `"{title}. {body}"` blocks.
    /// Only articles with neither title nor body are left out.
    pub async fn summarize(&self, articles: &[Article]) -> Result<ClusterSummary, InsightError> {
        let blocks: Vec<String> = articles
            .iter()
            .filter(|a| !(a.title.trim().is_empty() && a.body.trim().is_empty()))
            .map(Article::summary_block)
            .collect();
        self.summarize_texts(blocks).await
    }

    /// Summarize arbitrary text blocks.
    pub async fn summarize_texts(&self, blocks: Vec<String>) -> Result<ClusterSummary, InsightError> {
        if blocks.is_empty() {
            return Err(InsightError::EmptyCluster(
                "no article text to summarize".to_string(),
            ));
        }

        let mut calls = 0;
        let mut level = self.reduce_level(blocks, &mut calls).await?;
        let intermediate = level.len();

        let mut rounds = 0;
        while rounds < self.settings.max_reduction_depth
            && level.len() > 1
            && self.counter.count_tokens(&level.join(BLOCK_SEPARATOR)) > self.settings.max_chunk_tokens
        {
            level = self.reduce_level(level, &mut calls).await?;
            rounds += 1;
            debug!(round = rounds, remaining = level.len(), "Reduced intermediate summaries");
        }

        let text = self.generate(level.join(BLOCK_SEPARATOR)).await?;
        calls += 1;

        debug!(intermediate, rounds, calls, "Cluster summarized");
        Ok(ClusterSummary {
            text,
            intermediate,
            rounds,
            calls,
        })
    }

    /// Summarize each token-bounded chunk of `texts`.
    async fn reduce_level(
        &self,
        texts: Vec<String>,
        calls: &mut usize,
    ) -> Result<Vec<String>, InsightError> {
        let mut out = Vec::new();
        for chunk in chunk_by_tokens(texts, self.counter.as_ref(), self.settings.max_chunk_tokens) {
            out.push(self.generate(chunk.join(BLOCK_SEPARATOR)).await?);
            *calls += 1;
        }
        Ok(out)
    }

    async fn generate(&self, content: String) -> Result<String, InsightError> {
        let request = GenerationRequest {
            purpose: Purpose::Summary,
            instruction: SUMMARY_INSTRUCTION.to_string(),
            content,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let text = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| InsightError::Summarization(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(InsightError::Summarization(
                "generator returned an empty summary".to_string(),
            ));
        }
        Ok(text)
    }
}
