use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ports::ChatBackend, ChatRequest, ChatResponse, DomainError};
use crate::infrastructure::config::{HttpConfig, LlmConfig};
use crate::infrastructure::http::JsonClient;

use super::WireMessage;

/// Chat completions from an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct OpenAiChat {
    http: JsonClient,
    url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &LlmConfig, http: &HttpConfig) -> Result<Self, DomainError> {
        let api_key = http
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DomainError::auth("OpenAI API key is missing"))?;

        Ok(Self {
            http: JsonClient::new("openai", http)?,
            url: format!("{}/v1/chat/completions", http.base_url),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, DomainError> {
        debug!(model = %self.model, messages = request.messages.len(), "chat completion");
        let body = CompletionRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
        };
        let response: CompletionResponse =
            self.http.post(&self.url, Some(&self.api_key), &body).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DomainError::internal("OpenAI returned no completion"))?;

        Ok(ChatResponse::new(content).with_model(response.model.unwrap_or_else(|| self.model.clone())))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
