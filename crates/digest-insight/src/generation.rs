//! Text generation backends used by the labeler and the summarizer.

use async_trait::async_trait;
use tracing::debug;

use digest_openai::{ChatRequest, Message, OpenAiClient};

use crate::error::InsightError;
use crate::extractive::{
    frequent_bigram_title, leading_words, rank_sentences, split_sentences,
};

/// What a generation call is for. Offline backends use it to pick a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Label,
    Summary,
}

/// One request to a text generation backend.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub purpose: Purpose,
    /// Fixed instruction, sent as the system prompt.
    pub instruction: String,
    /// Material to work on, sent as the user message.
    pub content: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A text generation capability (prompt in, text out).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, InsightError>;
}

/// Chat-completion backed generator.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: OpenAiClient,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn chat_request(&self, request: &GenerationRequest) -> ChatRequest {
        ChatRequest::new(&self.model)
            .message(Message::system(&request.instruction))
            .message(Message::user(&request.content))
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, InsightError> {
        let response = self
            .client
            .chat_completion(&self.chat_request(request))
            .await
            .map_err(|e| InsightError::Upstream(e.to_string()))?;
        if let Some(usage) = response.usage {
            debug!(
                purpose = ?request.purpose,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generation usage"
            );
        }
        Ok(response.content.trim().to_string())
    }
}

/// Offline generator: frequent-bigram labels and top-ranked sentences as
/// bullet points. Deterministic and network-free.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_bullets: usize,
}

impl ExtractiveGenerator {
    pub fn new(max_bullets: usize) -> Self {
        Self {
            max_bullets: max_bullets.max(1),
        }
    }

    fn label(&self, content: &str) -> String {
        let titles: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        frequent_bigram_title(&titles)
            .unwrap_or_else(|| leading_words(titles.first().copied().unwrap_or(""), 5))
    }

    fn summary(&self, content: &str) -> String {
        let sentences = split_sentences(content);
        rank_sentences(&sentences, self.max_bullets)
            .into_iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl TextGenerator for ExtractiveGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, InsightError> {
        let output = match request.purpose {
            Purpose::Label => self.label(&request.content),
            Purpose::Summary => self.summary(&request.content),
        };
        Ok(output)
    }
}
