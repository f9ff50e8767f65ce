use std::sync::Arc;

use knowledge_assistant::application::{ChatOrchestrator, KnowledgeBaseIngestor, Retriever};
use knowledge_assistant::domain::TextChunker;
use knowledge_assistant::infrastructure::{
    create_chat_backend, create_embedding_backend, Config, FsDocumentSource, InMemoryVectorStore,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Ask a question about the indexed knowledge base.\n\
Commands: help (show this message), exit (quit).";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!(provider = %config.provider, "starting knowledge assistant");

    let embedding = create_embedding_backend(&config)?;
    let chat = create_chat_backend(&config)?;
    let store = Arc::new(InMemoryVectorStore::new());

    let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
    let ingestor = KnowledgeBaseIngestor::new(
        Arc::new(FsDocumentSource::new(config.knowledge.dir.clone())),
        embedding.clone(),
        chunker,
    )
    .with_batching(config.embedding.batch_size, config.embedding.concurrency);
    let report = ingestor
        .ingest(&config.knowledge.resources, store.as_ref())
        .await?;

    let retriever = Arc::new(Retriever::new(
        embedding,
        store,
        config.retrieval.max_results,
        config.retrieval.min_score,
    ));
    let mut orchestrator = ChatOrchestrator::new(
        retriever,
        chat,
        config.memory.max_messages,
        config.prompts.system.as_str(),
    );

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Indexed {} segments from {} documents. Type 'help' for usage.\n",
                report.segments, report.documents
            )
            .as_bytes(),
        )
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let reply = match line.trim() {
            "" => "Please type a question, or 'help'.".to_string(),
            "help" => HELP.to_string(),
            "exit" => break,
            query => match orchestrator.respond(query).await {
                Ok(answer) => answer,
                Err(e) if e.is_fatal() => {
                    stdout.write_all(format!("{}\n", e.user_message()).as_bytes()).await?;
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(error = %e, "query failed");
                    e.user_message()
                }
            },
        };
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    info!("bye");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "knowledge_assistant=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
