mod chat;
mod conversation;
mod document;
mod embedding;

pub use chat::{ChatRequest, ChatResponse};
pub use conversation::{ConversationMemory, Message, MessageRole};
pub use document::{ChunkMetadata, Document, DocumentChunk, IndexEntry, SearchResult};
pub use embedding::Embedding;
