//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! backends, so the same pipeline runs against OpenAI, Ollama or test fakes.

pub mod services;

pub use services::{
    ChatOrchestrator, IngestionReport, KnowledgeBaseIngestor, Retriever, NO_CONTEXT_MESSAGE,
};
