use async_trait::async_trait;

use crate::error::VectorResult;

/// Trait for embedding generation providers.
///
/// The actual model is an external collaborator; implementations adapt
/// whatever service hosts it. Returned vectors are ordered and
/// fixed-length for a given provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> VectorResult<Vec<f32>>;

    /// Generate embeddings for multiple texts in batch
    async fn embed_batch(&self, texts: &[String]) -> VectorResult<Vec<Vec<f32>>>;
}
