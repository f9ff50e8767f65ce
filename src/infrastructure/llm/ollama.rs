use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ports::ChatBackend, ChatRequest, ChatResponse, DomainError};
use crate::infrastructure::config::{HttpConfig, LlmConfig};
use crate::infrastructure::http::JsonClient;

use super::WireMessage;

/// Chat from a local Ollama server (`POST /api/chat`, non-streaming).
pub struct OllamaChat {
    http: JsonClient,
    url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig, http: &HttpConfig) -> Result<Self, DomainError> {
        Ok(Self {
            http: JsonClient::new("ollama", http)?,
            url: format!("{}/api/chat", http.base_url),
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatReply {
    model: Option<String>,
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

#[async_trait]
impl ChatBackend for OllamaChat {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, DomainError> {
        debug!(model = %self.model, messages = request.messages.len(), "chat");
        let body = ChatBody {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            stream: false,
        };
        let reply: ChatReply = self.http.post(&self.url, None, &body).await?;

        Ok(ChatResponse::new(reply.message.content)
            .with_model(reply.model.unwrap_or_else(|| self.model.clone())))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
