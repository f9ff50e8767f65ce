mod document_source;
mod embedding;
mod llm;
mod vector_store;

pub use document_source::DocumentSource;
pub use embedding::EmbeddingBackend;
pub use llm::ChatBackend;
pub use vector_store::VectorStore;
