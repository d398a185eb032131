use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DigestError, Result};

/// Top-level configuration for the digest pipeline.
///
/// Loaded from `~/.digest/config.toml` by default, then overlaid with
/// environment variables for secrets and per-run knobs. Each section maps
/// to one stage or collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl DigestConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DigestConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Overlay values from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary key lookup.
    ///
    /// Recognised keys: `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `TELEGRAM_TOKEN`,
    /// `TELEGRAM_CHAT_ID` (or legacy `TELEGRAM_ID`), `DIGEST_DATABASE_PATH`,
    /// `DIGEST_WINDOW_DAYS`. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(token) = get("TELEGRAM_TOKEN") {
            self.notify.telegram_token = Some(token);
        }
        if let Some(chat_id) = get("TELEGRAM_CHAT_ID").or_else(|| get("TELEGRAM_ID")) {
            self.notify.telegram_chat_id = Some(chat_id);
        }
        if let Some(path) = get("DIGEST_DATABASE_PATH") {
            self.storage.database_path = path;
        }
        if let Some(days) = get("DIGEST_WINDOW_DAYS") {
            match days.trim().parse::<u32>() {
                Ok(d) => self.general.window_days = d,
                Err(_) => warn!(value = %days, "Ignoring invalid DIGEST_WINDOW_DAYS"),
            }
        }
    }

    /// Check that every collaborator the configuration selects is usable.
    ///
    /// Missing credentials for a selected provider or sink are fatal.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.provider == Provider::OpenAi && self.openai.api_key.is_none() {
            return Err(DigestError::Config(
                "openai provider selected but OPENAI_API_KEY is not set".to_string(),
            ));
        }
        if self.notify.sink == SinkKind::Telegram {
            if self.notify.telegram_token.is_none() {
                return Err(DigestError::Config(
                    "telegram sink selected but TELEGRAM_TOKEN is not set".to_string(),
                ));
            }
            if self.notify.telegram_chat_id.is_none() {
                return Err(DigestError::Config(
                    "telegram sink selected but TELEGRAM_CHAT_ID is not set".to_string(),
                ));
            }
        }
        if self.notify.max_message_chars == 0 {
            return Err(DigestError::Config(
                "notify.max_message_chars must be positive".to_string(),
            ));
        }
        self.clustering.validate()?;
        if self.summarizer.max_chunk_tokens == 0 {
            return Err(DigestError::Config(
                "summarizer.max_chunk_tokens must be positive".to_string(),
            ));
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(DigestError::Config(
                "pipeline.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.pipeline.run_timeout_secs == 0 || self.pipeline.call_timeout_secs == 0 {
            return Err(DigestError::Config(
                "pipeline timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Days to look back from today's midnight (UTC).
    pub window_days: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window_days: 1,
        }
    }
}

/// Article store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "~/.digest/articles.db".to_string(),
        }
    }
}

/// OpenAI-compatible API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Usually supplied through `OPENAI_API_KEY` rather than the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Density clustering parameters. Read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Neighbourhood radius in cosine distance.
    pub eps: f64,
    /// Minimum neighbourhood size (self included) for a core point. Also the
    /// minimum number of embedded members for a category to be clustered.
    pub min_samples: usize,
    /// Maximum average cosine distance for moving a noise article into
    /// another category. Must be smaller than `eps`.
    pub reassign_threshold: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 0.2,
            min_samples: 4,
            reassign_threshold: 0.15,
        }
    }
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.eps > 0.0 && self.eps <= 2.0) {
            return Err(DigestError::Config(format!(
                "clustering.eps must be in (0, 2], got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(DigestError::Config(
                "clustering.min_samples must be at least 1".to_string(),
            ));
        }
        if !(self.reassign_threshold >= 0.0 && self.reassign_threshold < self.eps) {
            return Err(DigestError::Config(format!(
                "clustering.reassign_threshold ({}) must be in [0, eps={})",
                self.reassign_threshold, self.eps
            )));
        }
        Ok(())
    }
}

/// Labeling and summarization budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Token budget for one summarization request.
    pub max_chunk_tokens: usize,
    /// Maximum number of reduction rounds over intermediate summaries.
    pub max_reduction_depth: usize,
    pub summary_temperature: f32,
    pub summary_max_tokens: u32,
    pub label_max_tokens: u32,
    pub label_temperature: f32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: 14_000,
            max_reduction_depth: 4,
            summary_temperature: 0.2,
            summary_max_tokens: 1_024,
            label_max_tokens: 12,
            label_temperature: 0.0,
        }
    }
}

/// Where the digest is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Write messages to the log only.
    Log,
    Telegram,
}

/// Notification delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub sink: SinkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    /// Telegram `parse_mode`; empty sends plain text.
    pub parse_mode: String,
    /// Messages longer than this are split before sending.
    pub max_message_chars: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Log,
            telegram_token: None,
            telegram_chat_id: None,
            parse_mode: "Markdown".to_string(),
            max_message_chars: 4096,
        }
    }
}

/// Which backends produce embeddings and generated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    /// Hash embeddings and extractive text generation, no network.
    Offline,
}

/// Orchestrator limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub provider: Provider,
    /// Budget for the whole run.
    pub run_timeout_secs: u64,
    /// Budget for each external call.
    pub call_timeout_secs: u64,
    /// Concurrent external calls within a stage.
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            run_timeout_secs: 600,
            call_timeout_secs: 60,
            max_concurrency: 4,
        }
    }
}
