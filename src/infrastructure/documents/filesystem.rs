use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{ports::DocumentSource, Document, DomainError};

/// Plain-text resources read from a directory.
#[derive(Debug, Clone)]
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn load(&self, name: &str) -> Result<Document, DomainError> {
        let path = self.root.join(name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                DomainError::not_found(format!("resource {} does not exist", path.display()))
            }
            _ => DomainError::internal(format!("cannot read {}: {e}", path.display())),
        })?;

        let content = String::from_utf8(bytes).map_err(|_| {
            DomainError::unsupported(format!("{} is not valid UTF-8 text", path.display()))
        })?;

        debug!(path = %path.display(), chars = content.chars().count(), "loaded resource");
        Ok(Document::new(name, content))
    }
}
