use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ports::EmbeddingBackend, DomainError, Embedding};
use crate::infrastructure::config::{EmbeddingConfig, HttpConfig};
use crate::infrastructure::http::JsonClient;

use super::{check_count, reject_blank};

/// Embeddings from a local Ollama server (`POST /api/embed`).
pub struct OllamaEmbedding {
    http: JsonClient,
    url: String,
    model: String,
}

impl OllamaEmbedding {
    pub fn new(config: &EmbeddingConfig, http: &HttpConfig) -> Result<Self, DomainError> {
        Ok(Self {
            http: JsonClient::new("ollama", http)?,
            url: format!("{}/api/embed", http.base_url),
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingBackend for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        reject_blank(texts)?;

        debug!(model = %self.model, batch_size = texts.len(), "embedding batch");
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let response: EmbedResponse = self.http.post(&self.url, None, &request).await?;

        let embeddings = response.embeddings.into_iter().map(Embedding::new).collect();
        check_count(texts.len(), embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{AiProvider, Config};
    use crate::infrastructure::http::mock::serve;

    fn backend(base_url: String) -> OllamaEmbedding {
        let mut config = Config::for_provider(AiProvider::Ollama);
        config.http.base_url = base_url;
        config.http.max_retries = 0;
        OllamaEmbedding::new(&config.embedding, &config.http).unwrap()
    }

    #[test]
    fn test_endpoint_and_model() {
        let config = Config::for_provider(AiProvider::Ollama);
        let backend = OllamaEmbedding::new(&config.embedding, &config.http).unwrap();

        assert_eq!(backend.url, "http://localhost:11434/api/embed");
        assert_eq!(backend.model_name(), "nomic-embed-text");
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let url = serve(vec![(
            200,
            r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#,
        )])
        .await;

        let embeddings = backend(url).embed_batch(&["one", "two"]).await.unwrap();

        assert_eq!(
            embeddings,
            vec![Embedding::new(vec![0.1, 0.2]), Embedding::new(vec![0.3, 0.4])]
        );
    }

    #[tokio::test]
    async fn test_short_response_is_internal_error() {
        let url = serve(vec![(
            200,
            r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2]]}"#,
        )])
        .await;

        let err = backend(url).embed_batch(&["one", "two"]).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[tokio::test]
    async fn test_model_not_pulled_is_unavailable() {
        let url = serve(vec![(
            404,
            r#"{"error":"model \"nomic-embed-text\" not found"}"#,
        )])
        .await;

        let err = backend(url).embed("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::ProviderUnavailable(_)));
    }
}
