mod ollama;
mod openai;

pub use ollama::OllamaEmbedding;
pub use openai::OpenAiEmbedding;

use std::sync::Arc;

use tracing::info;

use crate::domain::{ports::EmbeddingBackend, DomainError, Embedding};
use crate::infrastructure::config::{AiProvider, Config};

/// Picks the embedding backend for the configured provider.
pub fn create_embedding_backend(config: &Config) -> Result<Arc<dyn EmbeddingBackend>, DomainError> {
    let backend: Arc<dyn EmbeddingBackend> = match config.provider {
        AiProvider::OpenAi => Arc::new(OpenAiEmbedding::new(&config.embedding, &config.http)?),
        AiProvider::Ollama => Arc::new(OllamaEmbedding::new(&config.embedding, &config.http)?),
    };
    info!(provider = %config.provider, model = backend.model_name(), "embedding backend ready");
    Ok(backend)
}

fn reject_blank(texts: &[&str]) -> Result<(), DomainError> {
    match texts.iter().position(|t| t.trim().is_empty()) {
        Some(i) => Err(DomainError::unsupported(format!(
            "cannot embed empty text (batch position {i})"
        ))),
        None => Ok(()),
    }
}

fn check_count(expected: usize, embeddings: Vec<Embedding>) -> Result<Vec<Embedding>, DomainError> {
    if embeddings.len() != expected {
        return Err(DomainError::internal(format!(
            "expected {expected} embeddings, backend returned {}",
            embeddings.len()
        )));
    }
    Ok(embeddings)
}
