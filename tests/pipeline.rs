//! End-to-end: index two short documents from disk, then ask one question the
//! knowledge base answers and one it cannot.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use knowledge_assistant::application::{
    ChatOrchestrator, KnowledgeBaseIngestor, Retriever, NO_CONTEXT_MESSAGE,
};
use knowledge_assistant::domain::ports::{ChatBackend, EmbeddingBackend};
use knowledge_assistant::domain::{
    ChatRequest, ChatResponse, DomainError, Embedding, MessageRole, TextChunker,
};
use knowledge_assistant::infrastructure::{Config, FsDocumentSource, InMemoryVectorStore};

const VOCABULARY: [&str; 8] = [
    "gateway", "port", "8080", "issue", "load", "times", "sky", "color",
];

/// Bag-of-words over a fixed vocabulary.
struct VocabularyEmbedding;

#[async_trait]
impl EmbeddingBackend for VocabularyEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::unsupported("empty text"));
        }
        let mut counts = vec![0.0; VOCABULARY.len()];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if let Some(i) = VOCABULARY.iter().position(|v| *v == word) {
                counts[i] += 1.0;
            }
        }
        Ok(Embedding::new(counts))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str {
        "vocabulary"
    }
}

/// Answers strictly from the context message it was given.
#[derive(Default)]
struct GroundedChat {
    requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait]
impl ChatBackend for GroundedChat {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, DomainError> {
        self.requests.lock().unwrap().push(request.clone());

        let context = request
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .nth(1)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let answer = if context == NO_CONTEXT_MESSAGE {
            "The context has no relevant information to answer that.".to_string()
        } else {
            format!("According to the knowledge base: {context}")
        };
        Ok(ChatResponse::new(answer).with_model("grounded"))
    }

    fn model_name(&self) -> &str {
        "grounded"
    }
}

struct Fixture {
    retriever: Arc<Retriever>,
    chat: Arc<GroundedChat>,
    config: Config,
    _dir: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("components.txt"),
        "The gateway service exposes port 8080.",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("knowledge.txt"),
        "Known issue: gateway times out under high load.",
    )
    .unwrap();

    let mut config = Config::default();
    config.knowledge.dir = dir.path().to_path_buf();

    let embedding: Arc<dyn EmbeddingBackend> = Arc::new(VocabularyEmbedding);
    let store = Arc::new(InMemoryVectorStore::new());
    let ingestor = KnowledgeBaseIngestor::new(
        Arc::new(FsDocumentSource::new(config.knowledge.dir.clone())),
        embedding.clone(),
        TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap).unwrap(),
    )
    .with_batching(config.embedding.batch_size, config.embedding.concurrency);

    let report = ingestor
        .ingest(&config.knowledge.resources, store.as_ref())
        .await
        .unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.segments, 2);

    let retriever = Arc::new(Retriever::new(
        embedding,
        store,
        config.retrieval.max_results,
        config.retrieval.min_score,
    ));

    Fixture {
        retriever,
        chat: Arc::new(GroundedChat::default()),
        config,
        _dir: dir,
    }
}

#[test]
fn test_defaults_match_scenario() {
    let config = Config::default();
    assert_eq!(config.chunking.chunk_size, 300);
    assert_eq!(config.chunking.chunk_overlap, 30);
    assert_eq!(config.retrieval.max_results, 3);
    assert!((config.retrieval.min_score - 0.2).abs() < f32::EPSILON);
    assert_eq!(config.knowledge.resources, vec!["components.txt", "knowledge.txt"]);
}

#[tokio::test]
async fn test_relevant_question_retrieves_first_document() {
    let fx = fixture().await;

    let results = fx
        .retriever
        .retrieve("What port does the gateway use?")
        .await
        .unwrap();

    // cos 0.816 for the port document, 0.354 for the load issue
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.content, "The gateway service exposes port 8080.");
    assert_eq!(results[0].chunk.metadata.source, "components.txt");
    assert_eq!(results[1].chunk.metadata.source, "knowledge.txt");
    assert!(results[0].score > results[1].score);
    assert!(results
        .iter()
        .all(|r| r.score >= fx.config.retrieval.min_score));
}

#[tokio::test]
async fn test_answers_from_context_and_remembers() {
    let fx = fixture().await;
    let mut orchestrator = ChatOrchestrator::new(
        fx.retriever.clone(),
        fx.chat.clone(),
        fx.config.memory.max_messages,
        fx.config.prompts.system.as_str(),
    );

    let answer = orchestrator
        .respond("What port does the gateway use?")
        .await
        .unwrap();

    assert!(answer.contains("8080"));
    assert!(answer.find("8080") < answer.find("times out"));
    assert_eq!(orchestrator.memory().len(), 2);

    let request = fx.chat.requests.lock().unwrap()[0].clone();
    assert_eq!(request.messages[0].content, fx.config.prompts.system);
}

#[tokio::test]
async fn test_unrelated_question_reports_no_information() {
    let fx = fixture().await;
    let mut orchestrator = ChatOrchestrator::new(
        fx.retriever.clone(),
        fx.chat.clone(),
        fx.config.memory.max_messages,
        fx.config.prompts.system.as_str(),
    );

    assert!(fx
        .retriever
        .retrieve("What color is the sky?")
        .await
        .unwrap()
        .is_empty());

    let answer = orchestrator.respond("What color is the sky?").await.unwrap();

    assert!(answer.contains("no relevant information"));
    assert!(!answer.contains("8080"));
    assert!(!answer.to_lowercase().contains("blue"));
}
