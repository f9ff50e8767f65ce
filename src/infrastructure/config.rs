//! Typed settings, read once at startup and passed down explicitly.
//!
//! Values come from a YAML file whose nested keys are flattened into dotted
//! names (`retriever: {max_results: 5}` is `retriever.max.results`). A value
//! written as `${VAR}` is taken from the environment. Values that fail to
//! parse fall back to their default with a warning; values that parse but
//! make no sense are rejected by [`Config::validate`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::domain::DomainError;

pub const CONFIG_PATH_ENV: &str = "KNOWLEDGE_ASSISTANT_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

const DEFAULT_OLLAMA_CHAT_MODEL: &str = "llama2";
const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Raw cosine similarity a passage needs to count as context.
pub const DEFAULT_MIN_SCORE: f32 = 0.2;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that answers questions about the \
operational knowledge of technical systems (components, status, faults, procedures). Answer \
accurately and concisely, relying strictly on the information provided in the context. Do not \
use any prior knowledge or make assumptions. If the context does not contain the answer, say \
that the knowledge base has no relevant information. Return the result in markdown format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiProvider {
    #[default]
    OpenAi,
    Ollama,
}

impl AiProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(DomainError::config(format!("unknown AI provider '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub provider: AiProvider,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub http: HttpConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub chunking: ChunkingConfig,
    pub knowledge: KnowledgeConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
    pub concurrency: usize,
}

/// Connection settings shared by the chat and embedding backends.
#[derive(Clone, PartialEq)]
pub struct HttpConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub log_requests: bool,
    pub log_responses: bool,
}

// Keeps the credential out of logs.
impl fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("log_requests", &self.log_requests)
            .field("log_responses", &self.log_responses)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub max_results: usize,
    pub min_score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    pub max_messages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeConfig {
    pub dir: PathBuf,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptsConfig {
    pub system: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_provider(AiProvider::default())
    }
}

impl Config {
    /// Defaults for everything, with model names and endpoint for `provider`.
    pub fn for_provider(provider: AiProvider) -> Self {
        let (chat_model, embedding_model, base_url) = match provider {
            AiProvider::OpenAi => (
                DEFAULT_OPENAI_CHAT_MODEL,
                DEFAULT_OPENAI_EMBEDDING_MODEL,
                DEFAULT_OPENAI_BASE_URL,
            ),
            AiProvider::Ollama => (
                DEFAULT_OLLAMA_CHAT_MODEL,
                DEFAULT_OLLAMA_EMBEDDING_MODEL,
                DEFAULT_OLLAMA_BASE_URL,
            ),
        };

        Self {
            provider,
            llm: LlmConfig {
                model: chat_model.to_string(),
            },
            embedding: EmbeddingConfig {
                model: embedding_model.to_string(),
                batch_size: 32,
                concurrency: 4,
            },
            http: HttpConfig {
                base_url: base_url.to_string(),
                api_key: None,
                timeout_secs: 60,
                max_retries: 3,
                log_requests: false,
                log_responses: false,
            },
            retrieval: RetrievalConfig {
                max_results: 3,
                min_score: DEFAULT_MIN_SCORE,
            },
            memory: MemoryConfig { max_messages: 10 },
            chunking: ChunkingConfig {
                chunk_size: 300,
                chunk_overlap: 30,
            },
            knowledge: KnowledgeConfig {
                dir: PathBuf::from("knowledge"),
                resources: vec!["components.txt".to_string(), "knowledge.txt".to_string()],
            },
            prompts: PromptsConfig {
                system: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
        }
    }

    /// Reads the file named by `KNOWLEDGE_ASSISTANT_CONFIG`, or `config.yaml`.
    pub fn from_env() -> Result<Self, DomainError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load(path)
    }

    /// Loads and validates settings. A missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let settings = match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration");
                Settings::from_yaml_str(&raw)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    path = %path.display(),
                    "configuration file not found, using defaults and environment"
                );
                Settings::default()
            }
            Err(e) => {
                return Err(DomainError::config(format!(
                    "cannot read {}: {e}",
                    path.display()
                )))
            }
        };

        let config = Self::from_settings(&settings);
        config.validate()?;
        Ok(config)
    }

    /// Builds typed settings, falling back to defaults for unusable values.
    pub fn from_settings(settings: &Settings) -> Self {
        let provider = settings.parsed("ai.provider", AiProvider::default());
        let mut config = Self::for_provider(provider);
        let p = provider.as_str();

        if let Some(model) = settings.get(&format!("{p}.chat.model")) {
            config.llm.model = model;
        }
        if let Some(model) = settings.get(&format!("{p}.embedding.model")) {
            config.embedding.model = model;
        }
        if let Some(url) = settings.get(&format!("{p}.base.url")) {
            config.http.base_url = url.trim_end_matches('/').to_string();
        }
        if provider == AiProvider::OpenAi {
            config.http.api_key = settings
                .get("openai.api.key")
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|key| !key.trim().is_empty());
        }

        config.http.log_requests =
            settings.flag(&format!("{p}.log.requests"), config.http.log_requests);
        config.http.log_responses =
            settings.flag(&format!("{p}.log.responses"), config.http.log_responses);
        config.http.timeout_secs = settings.parsed("http.timeout.secs", config.http.timeout_secs);
        config.http.max_retries = settings.parsed("http.max.retries", config.http.max_retries);

        config.embedding.batch_size =
            settings.parsed("embedding.batch.size", config.embedding.batch_size);
        config.embedding.concurrency =
            settings.parsed("embedding.concurrency", config.embedding.concurrency);

        config.retrieval.max_results =
            settings.parsed("retriever.max.results", config.retrieval.max_results);
        config.retrieval.min_score =
            settings.parsed("retriever.min.score", config.retrieval.min_score);
        config.memory.max_messages =
            settings.parsed("chat.memory.messages", config.memory.max_messages);
        config.chunking.chunk_size =
            settings.parsed("document.chunk.size", config.chunking.chunk_size);
        config.chunking.chunk_overlap =
            settings.parsed("document.chunk.overlap", config.chunking.chunk_overlap);

        if let Some(dir) = settings.get("knowledge.dir") {
            config.knowledge.dir = PathBuf::from(dir);
        }
        if let Some(resources) = settings.get("knowledge.resources") {
            let names: Vec<String> = resources
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if names.is_empty() {
                warn!("knowledge.resources is empty, using defaults");
            } else {
                config.knowledge.resources = names;
            }
        }
        if let Some(prompt) = settings.get("assistant.system.prompt") {
            config.prompts.system = prompt;
        }

        if config.provider == AiProvider::OpenAi && config.http.api_key.is_none() {
            warn!("no OpenAI API key configured; set openai.api.key or OPENAI_API_KEY");
        }

        config
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chunking.chunk_size == 0 {
            return Err(DomainError::config("document.chunk.size must be greater than 0"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(DomainError::config(format!(
                "document.chunk.overlap ({}) must be smaller than document.chunk.size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.max_results == 0 {
            return Err(DomainError::config("retriever.max.results must be at least 1"));
        }
        if !(-1.0..=1.0).contains(&self.retrieval.min_score) {
            return Err(DomainError::config(format!(
                "retriever.min.score ({}) must be within [-1, 1]",
                self.retrieval.min_score
            )));
        }
        if self.memory.max_messages == 0 {
            return Err(DomainError::config("chat.memory.messages must be at least 1"));
        }
        if self.embedding.batch_size == 0 || self.embedding.concurrency == 0 {
            return Err(DomainError::config(
                "embedding.batch.size and embedding.concurrency must be at least 1",
            ));
        }
        if self.knowledge.resources.is_empty() {
            return Err(DomainError::config("knowledge.resources must name at least one file"));
        }
        Ok(())
    }
}

/// Flat `dotted.key -> value` view of a configuration file.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn from_yaml_str(raw: &str) -> Result<Self, DomainError> {
        let value: serde_yaml::Value = serde_yaml::from_str(raw)
            .map_err(|e| DomainError::config(format!("invalid configuration file: {e}")))?;

        let mut values = HashMap::new();
        match value {
            serde_yaml::Value::Null => {}
            serde_yaml::Value::Mapping(_) => flatten("", &value, &mut values),
            _ => {
                return Err(DomainError::config(
                    "configuration file must contain a mapping at the top level",
                ))
            }
        }
        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// The resolved value for `key`, or `None` when absent or unresolvable.
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = self.values.get(&normalize_key(key))?;
        resolve_placeholder(key, raw)
    }

    fn parsed<T>(&self, key: &str, default: T) -> T
    where
        T: FromStr + fmt::Display,
    {
        let Some(value) = self.get(key) else {
            return default;
        };
        match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, value = %value, default = %default, "invalid value, using default");
                default
            }
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        let Some(value) = self.get(key) else {
            return default;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => true,
            "false" | "no" | "off" | "0" => false,
            _ => {
                warn!(key, value = %value, default, "invalid boolean, using default");
                default
            }
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase().replace('_', ".")
}

fn flatten(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, String>) {
    use serde_yaml::Value;

    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                let Some(name) = scalar_to_string(k) else {
                    warn!(?k, "ignoring non-scalar configuration key");
                    continue;
                };
                let key = if prefix.is_empty() {
                    normalize_key(&name)
                } else {
                    format!("{prefix}.{}", normalize_key(&name))
                };
                flatten(&key, v, out);
            }
        }
        Value::Sequence(items) => {
            let joined = items
                .iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        Value::Null => {}
        scalar => {
            if let Some(s) = scalar_to_string(scalar) {
                out.insert(prefix.to_string(), s);
            }
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `${VAR}` becomes the value of `VAR`; anything else is returned unchanged.
fn resolve_placeholder(key: &str, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let Some(name) = trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Some(raw.to_string());
    };

    if name.is_empty() {
        warn!(key, value = raw, "malformed environment placeholder");
        return None;
    }
    match std::env::var(name) {
        Ok(value) => {
            debug!(key, variable = name, "resolved placeholder from environment");
            Some(value)
        }
        Err(_) => {
            warn!(key, variable = name, "environment variable for placeholder not set");
            None
        }
    }
}
