mod chat;
mod ingestion;
mod retriever;

pub use chat::{ChatOrchestrator, NO_CONTEXT_MESSAGE};
pub use ingestion::{IngestionReport, KnowledgeBaseIngestor};
pub use retriever::Retriever;
