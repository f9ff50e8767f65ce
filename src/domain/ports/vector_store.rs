use crate::domain::{errors::DomainError, Embedding, IndexEntry, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends entries; existing entries are never replaced.
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<(), DomainError>;

    /// Entries scoring at least `min_score`, best first, at most `max_results`.
    async fn search(
        &self,
        query: &Embedding,
        max_results: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, DomainError>;

    async fn len(&self) -> Result<usize, DomainError>;

    async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }
}
