use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::ResourceNotFound(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Only transient network failures are worth another attempt. The HTTP
    /// client retries on exactly this.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Errors that make every later query fail too, so startup should abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::ResourceNotFound(_) | Self::Authentication(_)
        )
    }

    /// Text shown to the person at the console when a single query fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedInput(_) => {
                "Please type a question so I can search the knowledge base.".to_string()
            }
            Self::Authentication(_) => {
                "I can't reach the language model: the configured credential was rejected."
                    .to_string()
            }
            Self::TransientNetwork(_) | Self::ProviderUnavailable(_) => {
                "The language model is not reachable right now. Please try again in a moment."
                    .to_string()
            }
            _ => "I'm sorry, I encountered an error trying to respond. Please try rephrasing your question."
                .to_string(),
        }
    }
}
