//! End-to-end runs over an in-memory store with scripted collaborators.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::NamedTempFile;

use digest_core::error::DigestError;
use digest_insight::{GenerationRequest, InsightError, Purpose, TextGenerator};
use digest_notify::{NotificationSink, NotifyError};
use digest_pipeline::{JsonFileIngestor, Pipeline, PipelineError, PipelineSettings, Stage};
use digest_storage::{ArticleRepository, ArticleStore, Database};
use digest_vector::EmbeddingService;

/// Maps a headline keyword to a fixed direction and counts calls.
#[derive(Default)]
struct KeywordEmbedding {
    calls: Mutex<usize>,
    delay: Option<Duration>,
}

impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DigestError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let v = if text.contains("chip") {
            vec![1.0, 0.0, 0.0]
        } else if text.contains("telescope") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        };
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        3
    }
}

/// Labels with the first headline; summaries are `summary_lines` bullet
/// lines of 59 characters each.
struct ScriptedGenerator {
    summary_lines: usize,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, InsightError> {
        match request.purpose {
            Purpose::Label => {
                let first = request.content.lines().next().unwrap_or_default();
                Ok(format!("About {}", first))
            }
            Purpose::Summary => {
                let line = format!("- {}", "y".repeat(57));
                Ok(vec![line; self.summary_lines].join("\n"))
            }
        }
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
    Utc.with_ymd_and_hms(2026, 3, 2, 6, 30, 0).unwrap()
}

fn write_feed() -> NamedTempFile {
    let mut records = Vec::new();
    for i in 0..4 {
        records.push(serde_json::json!({
            "link": format!("https://news.example/tech/{}", i),
            "title": format!("New chip export rules, part {}", i),
            "body": "Manufacturers react to the announcement.",
            "category": "Tech",
            "published_at": "2026-03-01T08:00:00Z",
        }));
        records.push(serde_json::json!({
            "link": format!("https://news.example/science/{}", i),
            "title": format!("Space telescope images, set {}", i),
            "content": "Astronomers published the first frames.",
            "category": "Science",
            "published_at": "2026-03-01T09:00:00Z",
        }));
    }
    // A Tech article that reads like Science news
    records.push(serde_json::json!({
        "link": "https://news.example/tech/outlier",
        "title": "Startup builds a telescope mirror",
        "body": "The company showed its prototype.",
        "category": "Tech",
        "published_at": "2026-03-01T11:00:00Z",
    }));
    // Outside the window
    records.push(serde_json::json!({
        "link": "https://news.example/old",
        "title": "Old chip story",
        "body": "",
        "category": "Tech",
        "published_at": "2026-02-10T11:00:00Z",
    }));

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&records).unwrap().as_bytes())
        .unwrap();
    file
}

fn new_store() -> Arc<ArticleRepository> {
    Arc::new(ArticleRepository::new(Arc::new(
        Database::in_memory().unwrap(),
    )))
}

#[tokio::test]
async fn test_full_run_clusters_labels_and_delivers() {
    let feed = write_feed();
    let store = new_store();
    let embedder = Arc::new(KeywordEmbedding::default());
    let sink = Arc::new(RecordingSink::default());

    let pipeline = Pipeline::new(
        store.clone(),
        embedder.clone(),
        Arc::new(ScriptedGenerator { summary_lines: 2 }),
        sink.clone(),
        PipelineSettings::default(),
    )
    .unwrap()
    .with_ingestor(Arc::new(JsonFileIngestor::new(feed.path())));

    let done = pipeline.run_at(now()).await.unwrap();
    let report = &done.report;

    assert_eq!(report.stage, Stage::Done);
    assert_eq!(report.ingested, 10);
    assert_eq!(report.articles, 9);
    assert_eq!(report.embedded, 9);
    assert_eq!(report.embedding_failures, 0);
    // Science/#0, Science/sentinel (the moved outlier), Tech/#0
    assert_eq!(report.clusters, 3);
    assert_eq!(report.summaries, 3);
    assert_eq!(report.label_fallbacks, 0);
    assert_eq!(report.messages_delivered, 3);

    let entries = &done.digest.entries;
    assert_eq!(entries[0].category, "Science");
    assert_eq!(entries[0].article_count, 4);
    assert_eq!(entries[1].category, "Science");
    assert_eq!(entries[1].links, vec!["https://news.example/tech/outlier"]);
    assert_eq!(entries[2].category, "Tech");
    assert_eq!(entries[2].article_count, 4);

    let sent = sink.sent.lock().unwrap();
    assert_eq!(sent.len(), 3);
    assert!(sent[2].starts_with("🌍 Tech - About New chip export rules, part 0\n- y"));

    // Out-of-window articles are stored but never embedded
    let old = store.get_article("https://news.example/old").unwrap().unwrap();
    assert!(old.embedding.is_none());
}

#[tokio::test]
async fn test_second_run_reuses_stored_embeddings() {
    let feed = write_feed();
    let store = new_store();
    let embedder = Arc::new(KeywordEmbedding::default());

    let pipeline = Pipeline::new(
        store.clone(),
        embedder.clone(),
        Arc::new(ScriptedGenerator { summary_lines: 1 }),
        Arc::new(RecordingSink::default()),
        PipelineSettings::default(),
    )
    .unwrap()
    .with_ingestor(Arc::new(JsonFileIngestor::new(feed.path())));

    pipeline.run_at(now()).await.unwrap();
    assert_eq!(*embedder.calls.lock().unwrap(), 9);

    let second = pipeline.run_at(now()).await.unwrap();
    assert_eq!(second.report.ingested, 0);
    assert_eq!(second.report.embedded, 0);
    assert_eq!(*embedder.calls.lock().unwrap(), 9);
    assert_eq!(second.report.clusters, 3);
}

#[tokio::test]
async fn test_long_summary_is_split_for_delivery() {
    let store = new_store();
    let feed = write_feed();
    let sink = Arc::new(RecordingSink::default());

    // 150 lines of 59 characters plus separators: about 9000 characters
    let pipeline = Pipeline::new(
        store,
        Arc::new(KeywordEmbedding::default()),
        Arc::new(ScriptedGenerator { summary_lines: 150 }),
        sink.clone(),
        PipelineSettings::default(),
    )
    .unwrap()
    .with_ingestor(Arc::new(JsonFileIngestor::new(feed.path())));

    let done = pipeline.run_at(now()).await.unwrap();
    assert_eq!(done.report.messages_delivered, 3);

    let sent = sink.sent.lock().unwrap();
    assert!(sent.len() >= 9);
    assert!(sent.iter().all(|part| part.chars().count() <= 4096));
    assert!(sent[0].starts_with("🌍 Science - "));
}

#[tokio::test]
async fn test_run_timeout_reports_partial_progress() {
    let feed = write_feed();
    let store = new_store();
    let embedder = Arc::new(KeywordEmbedding {
        delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });

    let mut settings = PipelineSettings::default();
    settings.run_timeout = Duration::from_millis(200);

    let pipeline = Pipeline::new(
        store.clone(),
        embedder,
        Arc::new(ScriptedGenerator { summary_lines: 1 }),
        Arc::new(RecordingSink::default()),
        settings,
    )
    .unwrap()
    .with_ingestor(Arc::new(JsonFileIngestor::new(feed.path())));

    let err = pipeline.run_at(now()).await.unwrap_err();
    let partial = err.partial_report().cloned().unwrap();
    assert!(matches!(err, PipelineError::Timeout { .. }));
    assert_eq!(partial.stage, Stage::Scraped);
    assert_eq!(partial.articles, 9);
    assert_eq!(partial.embedded, 0);

    // Nothing was embedded before the run was cancelled
    let stored = store.list_articles_since(now() - chrono::Duration::days(2)).unwrap();
    assert!(stored.iter().all(|a| a.embedding.is_none()));
}

#[tokio::test]
async fn test_slow_embedding_call_is_a_per_item_failure() {
    let store = new_store();
    store
        .insert_article(
            &digest_core::types::Article::new(
                "https://news.example/1",
                "Quiet day",
                "Nothing happened.",
                Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            )
            .with_category("World"),
        )
        .unwrap();

    let mut settings = PipelineSettings::default();
    settings.call_timeout = Duration::from_millis(50);

    let pipeline = Pipeline::new(
        store,
        Arc::new(KeywordEmbedding {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        }),
        Arc::new(ScriptedGenerator { summary_lines: 1 }),
        Arc::new(RecordingSink::default()),
        settings,
    )
    .unwrap();

    let done = pipeline.run_at(now()).await.unwrap();
    assert_eq!(done.report.embedding_failures, 1);
    // The unembedded article still gets a cluster of its own category
    assert_eq!(done.report.clusters, 1);
    assert_eq!(done.digest.entries[0].category, "World");
}
