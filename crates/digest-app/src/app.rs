//! Composition root: builds the store and collaborators from configuration
//! and runs the subcommands against them.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use digest_core::config::{DigestConfig, Provider, SinkKind};
use digest_core::error::DigestError;
use digest_core::types::ArticleFilter;
use digest_insight::{ExtractiveGenerator, OpenAiGenerator, TextGenerator};
use digest_notify::{LogSink, NotificationSink, TelegramSink};
use digest_openai::OpenAiClient;
use digest_pipeline::{
    ArticleIngestor, Done, IngestReport, JsonFileIngestor, Pipeline, PipelineError,
    PipelineSettings,
};
use digest_storage::{ArticleRepository, ArticleStore, Database, SearchHit};
use digest_vector::{rank_by_similarity, DynEmbeddingService, MockEmbedding, OpenAiEmbedding};

use crate::cli::expand_home;

/// Open (creating if needed) the SQLite article store.
pub fn open_store(config: &DigestConfig) -> Result<Arc<ArticleRepository>, DigestError> {
    let path = expand_home(&config.storage.database_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(&path)?;
    info!(path = %path.display(), "Article store opened");
    Ok(Arc::new(ArticleRepository::new(Arc::new(db))))
}

fn openai_client(config: &DigestConfig) -> Result<OpenAiClient, DigestError> {
    let api_key = config.openai.api_key.clone().ok_or_else(|| {
        DigestError::Config("OPENAI_API_KEY is required for the openai provider".to_string())
    })?;
    OpenAiClient::new(api_key)
        .with_base_url(&config.openai.base_url)
        .with_timeout(Duration::from_secs(config.pipeline.call_timeout_secs))
        .map_err(|e| DigestError::Config(e.to_string()))
}

pub fn build_embedder(config: &DigestConfig) -> Result<Arc<dyn DynEmbeddingService>, DigestError> {
    match config.pipeline.provider {
        Provider::OpenAi => Ok(Arc::new(OpenAiEmbedding::new(
            openai_client(config)?,
            &config.openai.embedding_model,
        ))),
        Provider::Offline => Ok(Arc::new(MockEmbedding::new())),
    }
}

pub fn build_generator(config: &DigestConfig) -> Result<Arc<dyn TextGenerator>, DigestError> {
    match config.pipeline.provider {
        Provider::OpenAi => Ok(Arc::new(OpenAiGenerator::new(
            openai_client(config)?,
            &config.openai.chat_model,
        ))),
        Provider::Offline => Ok(Arc::new(ExtractiveGenerator::default())),
    }
}

pub fn build_sink(config: &DigestConfig) -> Result<Arc<dyn NotificationSink>, DigestError> {
    match config.notify.sink {
        SinkKind::Log => Ok(Arc::new(LogSink)),
        SinkKind::Telegram => {
            let token = config.notify.telegram_token.clone().ok_or_else(|| {
                DigestError::Config("TELEGRAM_TOKEN is required for the telegram sink".to_string())
            })?;
            let chat_id = config.notify.telegram_chat_id.clone().ok_or_else(|| {
                DigestError::Config(
                    "TELEGRAM_CHAT_ID is required for the telegram sink".to_string(),
                )
            })?;
            let sink = TelegramSink::new(token, chat_id)
                .with_parse_mode(&config.notify.parse_mode)
                .with_timeout(Duration::from_secs(config.pipeline.call_timeout_secs))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Build the pipeline for one `run` invocation.
pub fn build_pipeline(
    config: &DigestConfig,
    store: Arc<dyn ArticleStore>,
    import: Option<&Path>,
    dry_run: bool,
) -> Result<Pipeline, DigestError> {
    let mut settings = PipelineSettings::from_config(config);
    settings.dry_run = dry_run;

    let mut pipeline = Pipeline::new(
        store,
        build_embedder(config)?,
        build_generator(config)?,
        build_sink(config)?,
        settings,
    )?;

    if let Some(path) = import {
        pipeline = pipeline.with_ingestor(Arc::new(JsonFileIngestor::new(path)));
    }

    #[cfg(feature = "hf-tokenizer")]
    {
        if let Ok(path) = std::env::var("DIGEST_TOKENIZER_PATH") {
            let counter = digest_insight::HfTokenCounter::from_file(Path::new(&path))
                .map_err(|e| DigestError::Config(e.to_string()))?;
            pipeline = pipeline.with_token_counter(Arc::new(counter));
        }
    }

    Ok(pipeline)
}

/// Run the pipeline once over the configured window.
pub async fn run_digest(
    config: &DigestConfig,
    store: Arc<dyn ArticleStore>,
    import: Option<&Path>,
    dry_run: bool,
) -> Result<Done, PipelineError> {
    let pipeline = build_pipeline(config, store, import, dry_run)?;
    pipeline.run().await
}

/// Import a JSON file of articles without running the pipeline.
pub async fn import(store: &dyn ArticleStore, file: &Path) -> Result<IngestReport, DigestError> {
    let report = JsonFileIngestor::new(file).ingest(store).await?;
    Ok(report)
}

/// Stored articles ranked by similarity to `text`, as `(score, title, link)`.
pub async fn similar(
    store: &dyn ArticleStore,
    embedder: &dyn DynEmbeddingService,
    text: &str,
    limit: usize,
) -> Result<Vec<(f64, String, String)>, DigestError> {
    let query = embedder.embed_boxed(text).await?;
    let articles = store.list_articles(&ArticleFilter::default())?;
    let skipped = articles.iter().filter(|a| a.embedding.is_none()).count();
    if skipped > 0 {
        warn!(skipped, "Articles without embeddings are not ranked");
    }

    Ok(rank_by_similarity(&query, &articles, limit)
        .into_iter()
        .map(|s| (s.score, s.article.title.clone(), s.article.link.clone()))
        .collect())
}

pub fn search(
    store: &dyn ArticleStore,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchHit>, DigestError> {
    store.search(query, limit)
}

/// Delete every stored article. Refuses without confirmation.
pub fn purge(store: &dyn ArticleStore, confirmed: bool) -> Result<usize, DigestError> {
    if !confirmed {
        return Err(DigestError::Config(
            "purge deletes every article; pass --yes to confirm".to_string(),
        ));
    }
    let removed = store.purge()?;
    info!(removed, "Article store purged");
    Ok(removed)
}
