mod ollama;
mod openai;

pub use ollama::OllamaChat;
pub use openai::OpenAiChat;

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::{ports::ChatBackend, DomainError, Message};
use crate::infrastructure::config::{AiProvider, Config};

/// Picks the chat backend for the configured provider.
pub fn create_chat_backend(config: &Config) -> Result<Arc<dyn ChatBackend>, DomainError> {
    let backend: Arc<dyn ChatBackend> = match config.provider {
        AiProvider::OpenAi => Arc::new(OpenAiChat::new(&config.llm, &config.http)?),
        AiProvider::Ollama => Arc::new(OllamaChat::new(&config.llm, &config.http)?),
    };
    info!(provider = %config.provider, model = backend.model_name(), "chat backend ready");
    Ok(backend)
}

/// `{role, content}` as both providers expect it.
#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}
