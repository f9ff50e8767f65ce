pub mod config;
pub mod documents;
pub mod embedding;
pub mod http;
pub mod llm;
pub mod vector_store;

pub use config::{AiProvider, Config, Settings};
pub use documents::{FsDocumentSource, InMemoryDocumentSource};
pub use embedding::{create_embedding_backend, OllamaEmbedding, OpenAiEmbedding};
pub use llm::{create_chat_backend, OllamaChat, OpenAiChat};
pub use vector_store::InMemoryVectorStore;
