use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ports::EmbeddingBackend, DomainError, Embedding};
use crate::infrastructure::config::{EmbeddingConfig, HttpConfig};
use crate::infrastructure::http::JsonClient;

use super::{check_count, reject_blank};

/// Embeddings from an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbedding {
    http: JsonClient,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedding {
    pub fn new(config: &EmbeddingConfig, http: &HttpConfig) -> Result<Self, DomainError> {
        let api_key = http
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DomainError::auth("OpenAI API key is missing"))?;

        Ok(Self {
            http: JsonClient::new("openai", http)?,
            url: format!("{}/v1/embeddings", http.base_url),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbedding {
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
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let mut response: EmbeddingResponse = self
            .http
            .post(&self.url, Some(&self.api_key), &request)
            .await?;

        response.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Embedding> = response
            .data
            .into_iter()
            .map(|d| Embedding::new(d.embedding))
            .collect();
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

    fn backend(base_url: String) -> OpenAiEmbedding {
        let mut config = Config::for_provider(AiProvider::OpenAi);
        config.http.api_key = Some("sk-test".into());
        config.http.base_url = base_url;
        config.http.max_retries = 0;
        OpenAiEmbedding::new(&config.embedding, &config.http).unwrap()
    }

    #[test]
    fn test_missing_key_is_authentication_error() {
        let config = Config::for_provider(AiProvider::OpenAi);
        let err = OpenAiEmbedding::new(&config.embedding, &config.http)
            .err()
            .unwrap();
        assert!(matches!(err, DomainError::Authentication(_)));
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let mut config = Config::for_provider(AiProvider::OpenAi);
        config.http.api_key = Some("sk-test".into());
        config.http.base_url = "http://proxy.local".into();

        let backend = OpenAiEmbedding::new(&config.embedding, &config.http).unwrap();
        assert_eq!(backend.url, "http://proxy.local/v1/embeddings");
        assert_eq!(backend.model_name(), "text-embedding-3-small");
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_before_any_request() {
        let mut config = Config::for_provider(AiProvider::OpenAi);
        config.http.api_key = Some("sk-test".into());
        config.http.base_url = "http://127.0.0.1:9".into();

        let backend = OpenAiEmbedding::new(&config.embedding, &config.http).unwrap();
        let err = backend.embed("   ").await.unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedInput(_)));
    }

    #[tokio::test]
    async fn test_batch_follows_response_index() {
        let url = serve(vec![(
            200,
            r#"{"object":"list","data":[
                {"object":"embedding","index":2,"embedding":[0.0,0.0,1.0]},
                {"object":"embedding","index":0,"embedding":[1.0,0.0,0.0]},
                {"object":"embedding","index":1,"embedding":[0.0,1.0,0.0]}
            ],"model":"text-embedding-3-small"}"#,
        )])
        .await;

        let embeddings = backend(url)
            .embed_batch(&["first", "second", "third"])
            .await
            .unwrap();

        assert_eq!(
            embeddings,
            vec![
                Embedding::new(vec![1.0, 0.0, 0.0]),
                Embedding::new(vec![0.0, 1.0, 0.0]),
                Embedding::new(vec![0.0, 0.0, 1.0]),
            ]
        );
    }

    #[tokio::test]
    async fn test_short_response_is_internal_error() {
        let url = serve(vec![(
            200,
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[1.0,0.0]}]}"#,
        )])
        .await;

        let err = backend(url)
            .embed_batch(&["first", "second"])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[tokio::test]
    async fn test_rejected_key_is_authentication_error() {
        let url = serve(vec![(
            401,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        )])
        .await;

        let err = backend(url).embed("hello").await.unwrap_err();
        assert!(matches!(err, DomainError::Authentication(_)));
    }
}
