//! Digest pipeline orchestrator.
//!
//! Drives one run through the stages, owning the injected collaborators.
//! Per-item failures degrade the run (fallback label, skipped summary,
//! undelivered message); store failures and the run budget abort it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use digest_core::config::{ClusteringConfig, DigestConfig};
use digest_core::types::window_start;
use digest_insight::{
    ApproxTokenCounter, ClusterEngine, DigestReport, LabeledCluster, Labeler, SummarizedCluster,
    Summarizer, SummarizerSettings, TextGenerator, TokenCounter,
};
use digest_notify::{deliver, NotificationSink};
use digest_storage::{ArticleStore, UpsertOutcome};
use digest_vector::DynEmbeddingService;

use crate::error::PipelineError;
use crate::ingest::ArticleIngestor;
use crate::stage::{validate_transition, Stage};
use crate::stages::{Clustered, Done, Indexed, Labeled, RunContext, Scraped, Start, Summarized};
use crate::timeout::{bounded, TimeBoundGenerator, TimeBoundSink};

/// Limits and knobs for a run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub window_days: u32,
    pub clustering: ClusteringConfig,
    pub summarizer: SummarizerSettings,
    pub label_max_tokens: u32,
    pub label_temperature: f32,
    pub max_message_chars: usize,
    pub run_timeout: Duration,
    pub call_timeout: Duration,
    pub max_concurrency: usize,
    /// Render the digest to the log instead of the sink.
    pub dry_run: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &DigestConfig) -> Self {
        Self {
            window_days: config.general.window_days,
            clustering: config.clustering.clone(),
            summarizer: SummarizerSettings {
                max_chunk_tokens: config.summarizer.max_chunk_tokens,
                max_reduction_depth: config.summarizer.max_reduction_depth,
                max_tokens: config.summarizer.summary_max_tokens,
                temperature: config.summarizer.summary_temperature,
            },
            label_max_tokens: config.summarizer.label_max_tokens,
            label_temperature: config.summarizer.label_temperature,
            max_message_chars: config.notify.max_message_chars,
            run_timeout: Duration::from_secs(config.pipeline.run_timeout_secs),
            call_timeout: Duration::from_secs(config.pipeline.call_timeout_secs),
            max_concurrency: config.pipeline.max_concurrency,
            dry_run: false,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&DigestConfig::default())
    }
}

/// One configured pipeline. Each call to [`Pipeline::run`] is an independent
/// run over the current window.
pub struct Pipeline {
    store: Arc<dyn ArticleStore>,
    embedder: Arc<dyn DynEmbeddingService>,
    generator: Arc<dyn TextGenerator>,
    sink: Arc<dyn NotificationSink>,
    ingestor: Option<Arc<dyn ArticleIngestor>>,
    engine: ClusterEngine,
    labeler: Labeler,
    summarizer: Summarizer,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Build a pipeline. Generation and delivery calls are bounded by
    /// `settings.call_timeout`.
    pub fn new(
        store: Arc<dyn ArticleStore>,
        embedder: Arc<dyn DynEmbeddingService>,
        generator: Arc<dyn TextGenerator>,
        sink: Arc<dyn NotificationSink>,
        settings: PipelineSettings,
    ) -> Result<Self, PipelineError> {
        if settings.max_concurrency == 0 {
            return Err(PipelineError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        let engine = ClusterEngine::new(settings.clustering.clone())
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let generator: Arc<dyn TextGenerator> =
            Arc::new(TimeBoundGenerator::new(generator, settings.call_timeout));
        let sink: Arc<dyn NotificationSink> =
            Arc::new(TimeBoundSink::new(sink, settings.call_timeout));

        let labeler = Labeler::new(
            generator.clone(),
            settings.label_max_tokens,
            settings.label_temperature,
        );
        let summarizer = Summarizer::new(
            generator.clone(),
            Arc::new(ApproxTokenCounter),
            settings.summarizer.clone(),
        );

        Ok(Self {
            store,
            embedder,
            generator,
            sink,
            ingestor: None,
            engine,
            labeler,
            summarizer,
            settings,
        })
    }

    /// Count summarization tokens with `counter` instead of the estimate.
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.summarizer = Summarizer::new(
            self.generator.clone(),
            counter,
            self.settings.summarizer.clone(),
        );
        self
    }

    /// Run `ingestor` at the start of every run.
    pub fn with_ingestor(mut self, ingestor: Arc<dyn ArticleIngestor>) -> Self {
        self.ingestor = Some(ingestor);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run over the window ending now.
    pub async fn run(&self) -> Result<Done, PipelineError> {
        self.run_at(Utc::now()).await
    }

    /// Run over the window computed from `now`, under the run budget.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<Done, PipelineError> {
        let start = Start::new(
            window_start(now, self.settings.window_days),
            self.settings.dry_run,
        );
        let report = start.ctx.report.clone();
        info!(
            run_id = %report.snapshot().run_id,
            window_start = %start.ctx.window_start,
            dry_run = self.settings.dry_run,
            "Pipeline run started"
        );

        let budget = self.settings.run_timeout;
        match tokio::time::timeout(budget, self.run_stages(start)).await {
            Ok(Ok(done)) => Ok(done),
            Ok(Err(e)) => {
                error!(error = %e, stage = %report.snapshot().stage, "Pipeline run aborted");
                Err(e)
            }
            Err(_) => {
                let partial = report.snapshot();
                error!(
                    budget_secs = budget.as_secs(),
                    stage = %partial.stage,
                    "Pipeline run timed out"
                );
                Err(PipelineError::Timeout {
                    secs: budget.as_secs(),
                    report: Box::new(partial),
                })
            }
        }
    }

    async fn run_stages(&self, start: Start) -> Result<Done, PipelineError> {
        let scraped = self.scrape(start).await?;
        let indexed = self.index(scraped).await?;
        let clustered = self.cluster(indexed).await?;
        let labeled = self.label(clustered).await?;
        let summarized = self.summarize(labeled).await?;
        self.finish(summarized).await
    }

    /// Start -> Scraped: ingest, then read the window.
    pub async fn scrape(&self, start: Start) -> Result<Scraped, PipelineError> {
        let Start { ctx } = start;

        if let Some(ingestor) = &self.ingestor {
            let ingested = ingestor.ingest(self.store.as_ref()).await?;
            ctx.report.update(|r| r.ingested = ingested.inserted);
        }

        let articles = self.store.list_articles_since(ctx.window_start)?;
        ctx.report.update(|r| r.articles = articles.len());
        advance(&ctx, Stage::Scraped)?;
        info!(articles = articles.len(), "Stage scraped");
        Ok(Scraped { ctx, articles })
    }

    /// Scraped -> Indexed: embed articles that have no embedding yet.
    pub async fn index(&self, scraped: Scraped) -> Result<Indexed, PipelineError> {
        let Scraped { ctx, articles } = scraped;

        let pending: Vec<(String, String)> = articles
            .iter()
            .filter(|a| a.embedding.is_none())
            .map(|a| (a.link.clone(), a.embedding_text()))
            .collect();

        let articles = if pending.is_empty() {
            articles
        } else {
            let call_timeout = self.settings.call_timeout;
            let mut results = stream::iter(pending)
                .map(|(link, text)| async move {
                    let result = bounded(call_timeout, self.embedder.embed_boxed(&text)).await;
                    (link, result)
                })
                .buffered(self.settings.max_concurrency);

            while let Some((link, result)) = results.next().await {
                match result {
                    Ok(vector) => match self.store.upsert_embedding(&link, &vector)? {
                        UpsertOutcome::Stored => ctx.report.update(|r| r.embedded += 1),
                        UpsertOutcome::AlreadyPresent => {
                            debug!(link = %link, "Embedding already present")
                        }
                        UpsertOutcome::UnknownArticle => {
                            warn!(link = %link, "Embedded article is no longer stored")
                        }
                    },
                    Err(reason) => {
                        warn!(link = %link, error = %reason, "Embedding failed");
                        ctx.report.update(|r| r.embedding_failures += 1);
                    }
                }
            }
            self.store.list_articles_since(ctx.window_start)?
        };

        advance(&ctx, Stage::Indexed)?;
        let report = ctx.report.snapshot();
        info!(
            articles = articles.len(),
            embedded = report.embedded,
            failures = report.embedding_failures,
            "Stage indexed"
        );
        Ok(Indexed { ctx, articles })
    }

    /// Indexed -> Clustered, on a blocking thread.
    pub async fn cluster(&self, indexed: Indexed) -> Result<Clustered, PipelineError> {
        let Indexed { ctx, articles } = indexed;

        let engine = self.engine.clone();
        let outcome = tokio::task::spawn_blocking(move || engine.cluster(articles))
            .await
            .map_err(|e| PipelineError::Clustering(format!("clustering task failed: {}", e)))?
            .map_err(|e| PipelineError::Clustering(e.to_string()))?;

        ctx.report.update(|r| r.clusters = outcome.clusters.len());
        advance(&ctx, Stage::Clustered)?;
        info!(clusters = outcome.clusters.len(), "Stage clustered");
        Ok(Clustered {
            ctx,
            clusters: outcome.clusters,
            stats: outcome.stats,
        })
    }

    /// Clustered -> Labeled. A cluster whose label cannot be generated is
    /// labeled with its category name.
    pub async fn label(&self, clustered: Clustered) -> Result<Labeled, PipelineError> {
        let Clustered { ctx, clusters, .. } = clustered;
        let report = &ctx.report;

        let labeled: Vec<LabeledCluster> = stream::iter(clusters)
            .map(|cluster| async move {
                let result = {
                    let titles = cluster.titles();
                    self.labeler.label(titles.as_slice()).await
                };
                match result {
                    Ok(label) => LabeledCluster {
                        cluster,
                        label,
                        fallback: false,
                    },
                    Err(e) => {
                        warn!(cluster = %cluster.key, error = %e, "Label generation failed, using category name");
                        report.update(|r| r.label_fallbacks += 1);
                        let label = cluster.category().to_string();
                        LabeledCluster {
                            cluster,
                            label,
                            fallback: true,
                        }
                    }
                }
            })
            .buffered(self.settings.max_concurrency)
            .collect()
            .await;

        advance(&ctx, Stage::Labeled)?;
        info!(
            clusters = labeled.len(),
            fallbacks = labeled.iter().filter(|l| l.fallback).count(),
            "Stage labeled"
        );
        Ok(Labeled {
            ctx,
            clusters: labeled,
        })
    }

    /// Labeled -> Summarized. Clusters that cannot be summarized are skipped.
    pub async fn summarize(&self, labeled: Labeled) -> Result<Summarized, PipelineError> {
        let Labeled { ctx, clusters } = labeled;
        let report = &ctx.report;

        let summarized: Vec<SummarizedCluster> = stream::iter(clusters)
            .map(|labeled| async move {
                match self.summarizer.summarize(&labeled.cluster.members).await {
                    Ok(summary) => {
                        debug!(
                            cluster = %labeled.cluster.key,
                            intermediate = summary.intermediate,
                            calls = summary.calls,
                            "Cluster summarized"
                        );
                        report.update(|r| r.summaries += 1);
                        Some(SummarizedCluster {
                            key: labeled.cluster.key.clone(),
                            links: labeled.cluster.links(),
                            label: labeled.label,
                            summary: summary.text,
                        })
                    }
                    Err(e) => {
                        warn!(cluster = %labeled.cluster.key, error = %e, "Summarization failed, skipping cluster");
                        report.update(|r| r.summary_failures += 1);
                        None
                    }
                }
            })
            .buffered(self.settings.max_concurrency)
            .filter_map(|s| async move { s })
            .collect()
            .await;

        advance(&ctx, Stage::Summarized)?;
        info!(summaries = summarized.len(), "Stage summarized");
        Ok(Summarized {
            ctx,
            clusters: summarized,
        })
    }

    /// Summarized -> Done: render the digest and deliver it, one message per
    /// cluster.
    pub async fn finish(&self, summarized: Summarized) -> Result<Done, PipelineError> {
        let Summarized { ctx, clusters } = summarized;

        let digest = DigestReport::new(ctx.window_start, &clusters);
        let messages = digest.render_messages();

        if self.settings.dry_run {
            for message in &messages {
                info!("Dry run, digest message not sent:\n{}", message);
            }
        } else {
            for message in &messages {
                match deliver(self.sink.as_ref(), message, self.settings.max_message_chars).await {
                    Ok(parts) => {
                        debug!(sink = self.sink.name(), parts, "Digest message delivered");
                        ctx.report.update(|r| r.messages_delivered += 1);
                    }
                    Err(e) => {
                        warn!(sink = self.sink.name(), error = %e, "Digest message not delivered");
                        ctx.report.update(|r| r.messages_failed += 1);
                    }
                }
            }
        }

        advance(&ctx, Stage::Done)?;
        let report = ctx.report.snapshot();

        let result = if digest.is_empty() {
            "Run complete: nothing to digest in window".to_string()
        } else if self.settings.dry_run {
            format!("Run complete: {} digest messages rendered (dry run)", messages.len())
        } else {
            format!(
                "Run complete: {} of {} digest messages delivered",
                report.messages_delivered,
                messages.len()
            )
        };

        info!(
            run_id = %report.run_id,
            articles = report.articles,
            clusters = report.clusters,
            summaries = report.summaries,
            delivered = report.messages_delivered,
            failed = report.messages_failed,
            "{}",
            result
        );

        Ok(Done {
            result,
            digest,
            report,
        })
    }
}

/// Record that the run reached `to`.
fn advance(ctx: &RunContext, to: Stage) -> Result<(), PipelineError> {
    let from = ctx.report.snapshot().stage;
    validate_transition(from, to)?;
    ctx.report.update(|r| r.stage = to);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use digest_core::types::Article;
    use digest_insight::{ExtractiveGenerator, GenerationRequest, InsightError};
    use digest_notify::{LogSink, NotifyError};
    use digest_storage::{ArticleRepository, Database};
    use digest_vector::MockEmbedding;
    use std::sync::Mutex;

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, InsightError> {
            Err(InsightError::Upstream("503".into()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap()
    }

    fn store_with(articles: &[Article]) -> Arc<ArticleRepository> {
        let store = Arc::new(ArticleRepository::new(Arc::new(
            Database::in_memory().unwrap(),
        )));
        for a in articles {
            store.insert_article(a).unwrap();
        }
        store
    }

    fn article(link: &str, title: &str) -> Article {
        Article::new(
            link,
            title,
            "Officials confirmed the plan on Sunday.",
            Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        )
        .with_category("World")
    }

    fn pipeline(
        store: Arc<ArticleRepository>,
        generator: Arc<dyn TextGenerator>,
        sink: Arc<dyn NotificationSink>,
    ) -> Pipeline {
        Pipeline::new(
            store,
            Arc::new(MockEmbedding::new()),
            generator,
            sink,
            PipelineSettings::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = DigestConfig::default();
        config.pipeline.call_timeout_secs = 5;
        config.summarizer.max_chunk_tokens = 2_000;
        let settings = PipelineSettings::from_config(&config);
        assert_eq!(settings.call_timeout, Duration::from_secs(5));
        assert_eq!(settings.run_timeout, Duration::from_secs(600));
        assert_eq!(settings.summarizer.max_chunk_tokens, 2_000);
        assert_eq!(settings.label_max_tokens, 12);
        assert!(!settings.dry_run);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let mut settings = PipelineSettings::default();
        settings.max_concurrency = 0;
        let result = Pipeline::new(
            store_with(&[]),
            Arc::new(MockEmbedding::new()),
            Arc::new(ExtractiveGenerator::default()),
            Arc::new(LogSink),
            settings,
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[tokio::test]
    async fn test_stage_by_stage() {
        let store = store_with(&[
            article("a", "Border talks resume"),
            article("b", "Border talks stall"),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let p = pipeline(store.clone(), Arc::new(ExtractiveGenerator::default()), sink.clone());

        let start = Start::new(window_start(now(), 1), false);
        let scraped = p.scrape(start).await.unwrap();
        assert_eq!(scraped.articles.len(), 2);
        assert!(scraped.articles.iter().all(|a| a.embedding.is_none()));

        let indexed = p.index(scraped).await.unwrap();
        assert!(indexed.articles.iter().all(|a| a.embedding.is_some()));
        assert_eq!(indexed.ctx.report.snapshot().embedded, 2);

        let clustered = p.cluster(indexed).await.unwrap();
        assert_eq!(clustered.clusters.len(), 1);

        let labeled = p.label(clustered).await.unwrap();
        assert!(!labeled.clusters[0].fallback);
        assert_eq!(labeled.clusters[0].label, "Border Talks");

        let summarized = p.summarize(labeled).await.unwrap();
        assert_eq!(summarized.clusters.len(), 1);

        let done = p.finish(summarized).await.unwrap();
        assert_eq!(done.report.stage, Stage::Done);
        assert_eq!(done.report.messages_delivered, 1);
        let sent = sink.sent.lock().unwrap();
        assert!(sent[0].starts_with("🌍 World - Border Talks\n"));
    }

    #[tokio::test]
    async fn test_label_fallback_and_skipped_summary() {
        let store = store_with(&[article("a", "Border talks resume")]);
        let sink = Arc::new(RecordingSink::default());
        let done = pipeline(store, Arc::new(FailingGenerator), sink.clone())
            .run_at(now())
            .await
            .unwrap();

        assert_eq!(done.report.clusters, 1);
        assert_eq!(done.report.label_fallbacks, 1);
        assert_eq!(done.report.summary_failures, 1);
        assert_eq!(done.report.summaries, 0);
        assert!(done.digest.is_empty());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_send() {
        let store = store_with(&[article("a", "Border talks resume")]);
        let sink = Arc::new(RecordingSink::default());
        let mut settings = PipelineSettings::default();
        settings.dry_run = true;
        let p = Pipeline::new(
            store,
            Arc::new(MockEmbedding::new()),
            Arc::new(ExtractiveGenerator::default()),
            sink.clone(),
            settings,
        )
        .unwrap();

        let done = p.run_at(now()).await.unwrap();
        assert!(done.report.dry_run);
        assert_eq!(done.digest.entries.len(), 1);
        assert_eq!(done.report.messages_delivered, 0);
        assert!(sink.sent.lock().unwrap().is_empty());
        assert!(done.result.contains("dry run"));
    }

    #[tokio::test]
    async fn test_out_of_window_articles_are_ignored() {
        let old = Article::new(
            "old",
            "Last week's news",
            "",
            Utc.with_ymd_and_hms(2026, 2, 20, 10, 0, 0).unwrap(),
        );
        let store = store_with(&[old]);
        let done = pipeline(
            store.clone(),
            Arc::new(ExtractiveGenerator::default()),
            Arc::new(LogSink),
        )
        .run_at(now())
        .await
        .unwrap();

        assert_eq!(done.report.articles, 0);
        assert!(done.digest.is_empty());
        // Nothing outside the window is embedded
        assert!(store.get_article("old").unwrap().unwrap().embedding.is_none());
    }
}
