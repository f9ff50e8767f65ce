use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::{ports::VectorStore, DomainError, Embedding, IndexEntry, SearchResult};

/// Append-only vector index scored by cosine similarity.
///
/// Reads take a shared lock, so any number of conversations can search
/// concurrently once ingestion has finished.
pub struct InMemoryVectorStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Fixed by the first successful `add`.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().ok().and_then(|inner| inner.dimension)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<(), DomainError> {
        let mut store = self
            .inner
            .write()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let dimension = match store.dimension {
            Some(dimension) => dimension,
            None => match entries.first() {
                Some(entry) => entry.embedding.dimension(),
                None => return Ok(()),
            },
        };

        // Validate the whole batch before touching the index.
        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.dimension() != dimension)
        {
            return Err(DomainError::unsupported(format!(
                "embedding dimension {} does not match index dimension {}",
                bad.embedding.dimension(),
                dimension
            )));
        }

        store.dimension = Some(dimension);
        store.entries.extend(entries);
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        max_results: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let store = self
            .inner
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let Some(dimension) = store.dimension else {
            return Ok(Vec::new());
        };
        if query.dimension() != dimension {
            return Err(DomainError::unsupported(format!(
                "query dimension {} does not match index dimension {}",
                query.dimension(),
                dimension
            )));
        }

        let mut results: Vec<SearchResult> = store
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: query.cosine_similarity(&entry.embedding),
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(max_results);

        Ok(results)
    }

    async fn len(&self) -> Result<usize, DomainError> {
        let store = self
            .inner
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(store.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentChunk;
    use crate::infrastructure::config::Config;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn entry(content: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            DocumentChunk::new(Uuid::new_v4(), content, 0),
            Embedding::new(vector),
        )
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let store = InMemoryVectorStore::new();
        store
            .add(vec![entry("test content", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let results = store.search(&query, 1, 0.5).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.content, "test content");
        assert!((results[0].score - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let store = InMemoryVectorStore::new();
        let query = Embedding::new(vec![1.0, 0.0]);

        let results = store.search(&query, 10, -1.0).await.unwrap();

        assert!(results.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[tokio::test]
    async fn test_min_score_filters_and_max_results_caps() {
        let store = InMemoryVectorStore::new();
        store
            .add(vec![
                entry("far", vec![0.0, 1.0]),
                entry("close", vec![1.0, 0.1]),
                entry("closer", vec![1.0, 0.0]),
                entry("near", vec![1.0, 0.5]),
            ])
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let results = store.search(&query, 2, 0.5).await.unwrap();

        let contents: Vec<_> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["closer", "close"]);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = InMemoryVectorStore::new();
        store
            .add(vec![
                entry("first", vec![1.0, 0.0]),
                entry("second", vec![2.0, 0.0]),
                entry("third", vec![3.0, 0.0]),
            ])
            .await
            .unwrap();

        let query = Embedding::new(vec![1.0, 0.0]);
        let results = store.search(&query, 3, 0.0).await.unwrap();

        let contents: Vec<_> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected_atomically() {
        let store = InMemoryVectorStore::new();
        store.add(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();

        let err = store
            .add(vec![entry("b", vec![1.0, 0.0]), entry("c", vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedInput(_)));
        assert_eq!(store.len().await.unwrap(), 1);

        let err = store
            .search(&Embedding::new(vec![1.0]), 1, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedInput(_)));
    }

    #[tokio::test]
    async fn test_default_threshold_keeps_moderately_similar_passages() {
        let store = InMemoryVectorStore::new();
        store.add(vec![entry("related", vec![1.0, 0.0])]).await.unwrap();

        // cos = 0.5, a typical score for a related passage under real models
        let query = Embedding::new(vec![0.5, 0.75f32.sqrt()]);
        let min_score = Config::default().retrieval.min_score;
        let results = store.search(&query, 3, min_score).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.5).abs() < 1e-4);

        let unrelated = Embedding::new(vec![0.1, 0.995f32.sqrt()]);
        assert!(store.search(&unrelated, 3, min_score).await.unwrap().is_empty());
    }

    fn arb_vector(dim: usize) -> impl Strategy<Value = Vec<f32>> {
        proptest::collection::vec(-1.0f32..1.0f32, dim)
            .prop_filter("non-zero vector", |v| v.iter().any(|x| x.abs() > 1e-3))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn single_entry_is_found_by_its_own_vector(
            vector in arb_vector(8),
            max_results in 1usize..10,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.add(vec![entry("only", vector.clone())]).await.unwrap();
                let query = Embedding::new(vector.clone());
                let best = query.cosine_similarity(&query);
                store.search(&query, max_results, best).await.unwrap()
            });

            prop_assert_eq!(results.len(), 1);
            prop_assert_eq!(results[0].chunk.content.as_str(), "only");
            prop_assert!((results[0].score - 1.0).abs() < 1e-4);
        }

        #[test]
        fn results_are_sorted_and_bounded(
            vectors in proptest::collection::vec(arb_vector(4), 0..20),
            query in arb_vector(4),
            max_results in 1usize..25,
            min_score in -1.0f32..1.0f32,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                let entries = vectors.iter().map(|v| entry("e", v.clone())).collect();
                store.add(entries).await.unwrap();
                store.search(&Embedding::new(query.clone()), max_results, min_score).await.unwrap()
            });

            prop_assert!(results.len() <= max_results);
            prop_assert!(results.iter().all(|r| r.score >= min_score));
            prop_assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }
}
