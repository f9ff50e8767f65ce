use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::application::services::Retriever;
use crate::domain::{
    ports::ChatBackend, ChatRequest, ConversationMemory, DomainError, Message, SearchResult,
};

pub const NO_CONTEXT_MESSAGE: &str = "The knowledge base has no relevant information for this \
question. Tell the user that the context has no relevant information instead of answering \
from general knowledge.";

/// One conversation: retrieval, prompt assembly, model call and memory.
///
/// The retriever and chat backend are shared; the memory is owned, so a
/// conversation is driven by one caller at a time through `&mut self`.
pub struct ChatOrchestrator {
    retriever: Arc<Retriever>,
    chat: Arc<dyn ChatBackend>,
    memory: ConversationMemory,
    system_prompt: String,
}

impl ChatOrchestrator {
    pub fn new(
        retriever: Arc<Retriever>,
        chat: Arc<dyn ChatBackend>,
        memory_window: usize,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            chat,
            memory: ConversationMemory::new(memory_window),
            system_prompt: system_prompt.into(),
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn reset(&mut self) {
        self.memory.clear();
    }

    /// Answers `message` from retrieved context and recent history.
    ///
    /// Memory is only updated once the model has answered, so a failed call
    /// can be retried against the same history.
    #[instrument(skip(self, message), fields(history = self.memory.len()))]
    pub async fn respond(&mut self, message: &str) -> Result<String, DomainError> {
        if message.trim().is_empty() {
            return Err(DomainError::unsupported("query is empty"));
        }

        let passages = self.retriever.retrieve(message).await?;
        let request = self.assemble(message, &passages);

        let response = self.chat.complete(&request).await.map_err(|e| {
            error!(error = %e, model = self.chat.model_name(), "chat backend failed");
            e
        })?;

        self.memory.append(Message::user(message));
        self.memory.append(Message::assistant(response.content.as_str()));
        info!(passages = passages.len(), "answered");

        Ok(response.content)
    }

    fn assemble(&self, message: &str, passages: &[SearchResult]) -> ChatRequest {
        let mut messages = Vec::with_capacity(self.memory.len() + 3);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.push(Message::system(context_message(passages)));
        messages.extend(self.memory.snapshot());
        messages.push(Message::user(message));
        ChatRequest::new(messages)
    }
}

fn context_message(passages: &[SearchResult]) -> String {
    if passages.is_empty() {
        return NO_CONTEXT_MESSAGE.to_string();
    }

    let context = passages
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}", i + 1, r.chunk.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Context:\n{context}")
}
