use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{info, instrument};

use crate::domain::{
    ports::{DocumentSource, EmbeddingBackend, VectorStore},
    DocumentChunk, DomainError, IndexEntry, TextChunker,
};

/// What one ingestion run put into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents: usize,
    pub segments: usize,
}

/// Builds the vector index from named resources, once, before any query.
pub struct KnowledgeBaseIngestor {
    source: Arc<dyn DocumentSource>,
    embedding: Arc<dyn EmbeddingBackend>,
    chunker: TextChunker,
    batch_size: usize,
    concurrency: usize,
}

impl KnowledgeBaseIngestor {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        embedding: Arc<dyn EmbeddingBackend>,
        chunker: TextChunker,
    ) -> Self {
        Self {
            source,
            embedding,
            chunker,
            batch_size: 32,
            concurrency: 4,
        }
    }

    /// Segments per embedding request and requests in flight. Zero is treated as one.
    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    /// Loads, chunks and embeds every resource, then appends the lot in one
    /// `add`. Any failure leaves `store` as it was.
    #[instrument(skip(self, names, store), fields(resources = names.len()))]
    pub async fn ingest(
        &self,
        names: &[String],
        store: &dyn VectorStore,
    ) -> Result<IngestionReport, DomainError> {
        let mut documents = Vec::with_capacity(names.len());
        for name in names {
            documents.push(self.source.load(name).await?);
        }

        let chunks: Vec<DocumentChunk> = documents
            .iter()
            .flat_map(|doc| self.chunker.split(doc))
            .filter(|chunk| !chunk.content.trim().is_empty())
            .collect();

        let embedding = &self.embedding;
        let batches: Vec<_> = stream::iter(chunks.chunks(self.batch_size))
            .map(|batch| async move {
                let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
                embedding.embed_batch(&texts).await
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .cloned()
            .zip(batches.into_iter().flatten())
            .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
            .collect();
        if entries.len() != chunks.len() {
            return Err(DomainError::internal(format!(
                "embedded {} of {} segments",
                entries.len(),
                chunks.len()
            )));
        }

        store.add(entries).await?;

        let report = IngestionReport {
            documents: documents.len(),
            segments: chunks.len(),
        };
        info!(
            documents = report.documents,
            segments = report.segments,
            model = self.embedding.model_name(),
            "knowledge base indexed"
        );
        Ok(report)
    }
}
