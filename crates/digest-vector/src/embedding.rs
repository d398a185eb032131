//! Embedding service trait and implementations.
//!
//! - `OpenAiEmbedding` calls the `/embeddings` endpoint of an
//!   OpenAI-compatible server. This is the production backend.
//! - `MockEmbedding` provides deterministic hash-based vectors for offline
//!   runs and tests.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use digest_core::error::DigestError;
use digest_openai::OpenAiClient;
use tracing::debug;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors. Used when
/// indexing articles and when ranking articles against a query.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, DigestError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, which is not
/// object-safe. This trait boxes the future so `Arc<dyn DynEmbeddingService>`
/// can be injected into the orchestrator. Every `EmbeddingService` gets it
/// through the blanket impl.
pub trait DynEmbeddingService: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, DigestError>> + Send + 'a>>;

    fn dimensions(&self) -> usize;
}

impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<f32>, DigestError>> + Send + 'a>> {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

// ---------------------------------------------------------------------------
// OpenAiEmbedding
// ---------------------------------------------------------------------------

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedding {
    client: OpenAiClient,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedding {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimensions = known_dimensions(&model);
        Self {
            client,
            model,
            dimensions,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Output size of the common OpenAI embedding models.
fn known_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

impl EmbeddingService for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DigestError> {
        if text.trim().is_empty() {
            return Err(DigestError::DegenerateInput(
                "Cannot embed empty text".to_string(),
            ));
        }
        let vector = self
            .client
            .create_embedding(text, &self.model)
            .await
            .map_err(|e| DigestError::upstream("embedding", e.to_string()))?;
        debug!(model = %self.model, dims = vector.len(), "Embedding created");
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors
// ---------------------------------------------------------------------------

/// Mock embedding service returning deterministic unit vectors.
///
/// The output is derived from a hash of the input text, so identical inputs
/// always produce identical outputs.
#[derive(Debug, Clone)]
pub struct MockEmbedding {
    dimensions: usize,
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(384)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }
        result
    }
}

impl EmbeddingService for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DigestError> {
        if text.is_empty() {
            return Err(DigestError::DegenerateInput(
                "Cannot embed empty text".to_string(),
            ));
        }
        Ok(self.hash_to_vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
