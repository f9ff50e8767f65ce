use crate::domain::{errors::DomainError, Embedding};
use async_trait::async_trait;

/// Turns text into fixed-dimension vectors.
///
/// Implementations reject empty or whitespace-only input with
/// [`DomainError::UnsupportedInput`].
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError>;

    /// Order-preserving; the result has the same length as `texts`.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError>;

    fn model_name(&self) -> &str;
}
