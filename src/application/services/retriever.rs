use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::{
    ports::{EmbeddingBackend, VectorStore},
    DomainError, SearchResult,
};

/// Embeds a query and looks it up in the vector index.
pub struct Retriever {
    embedding: Arc<dyn EmbeddingBackend>,
    vector_store: Arc<dyn VectorStore>,
    max_results: usize,
    min_score: f32,
}

impl Retriever {
    pub fn new(
        embedding: Arc<dyn EmbeddingBackend>,
        vector_store: Arc<dyn VectorStore>,
        max_results: usize,
        min_score: f32,
    ) -> Self {
        Self {
            embedding,
            vector_store,
            max_results,
            min_score,
        }
    }

    /// Passages scoring at least `min_score`, best first. An empty result
    /// means nothing relevant was indexed, not a failure.
    #[instrument(skip(self, query), fields(query_chars = query.chars().count()))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<SearchResult>, DomainError> {
        let embedding = self.embedding.embed(query).await?;
        let results = self
            .vector_store
            .search(&embedding, self.max_results, self.min_score)
            .await?;
        debug!(found = results.len(), "retrieved passages");
        Ok(results)
    }
}
