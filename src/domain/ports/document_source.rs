use async_trait::async_trait;

use crate::domain::{errors::DomainError, Document};

/// Named plain-text resources available for ingestion.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fails with [`DomainError::ResourceNotFound`] when `name` does not exist.
    async fn load(&self, name: &str) -> Result<Document, DomainError>;
}
