use crate::domain::{errors::DomainError, ChatRequest, ChatResponse};
use async_trait::async_trait;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One round trip to the model. No tool calls, no streaming.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, DomainError>;

    fn model_name(&self) -> &str;
}
