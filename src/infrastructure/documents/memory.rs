use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{ports::DocumentSource, Document, DomainError};

/// Resources held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentSource {
    resources: HashMap<String, String>,
}

impl InMemoryDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.resources.insert(name.into(), content.into());
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn load(&self, name: &str) -> Result<Document, DomainError> {
        self.resources
            .get(name)
            .map(|content| Document::new(name, content.as_str()))
            .ok_or_else(|| DomainError::not_found(format!("resource {name} does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_by_name() {
        let source = InMemoryDocumentSource::new().with("a.txt", "alpha");
        assert_eq!(source.load("a.txt").await.unwrap().content, "alpha");

        let err = source.load("b.txt").await.unwrap_err();
        assert!(matches!(err, DomainError::ResourceNotFound(_)));
    }
}
