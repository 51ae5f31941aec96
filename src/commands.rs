use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, show_config};
use crate::database::QdrantClient;
use crate::embeddings::Embedder;
use crate::ingest::{Ingestor, resolve_docs_dir};
use crate::openai::OpenAiClient;
use crate::rag::Assistant;
use crate::server;

/// Wire the configured OpenAI and Qdrant clients into an assistant
#[inline]
pub fn build_assistant(config: &Config) -> Result<Assistant> {
    let openai = Arc::new(
        OpenAiClient::new(&config.openai).context("Failed to initialize OpenAI client")?,
    );
    let qdrant =
        Arc::new(QdrantClient::new(&config.qdrant).context("Failed to initialize Qdrant client")?);

    let embedder: Arc<dyn Embedder> = Arc::<OpenAiClient>::clone(&openai);

    Ok(Assistant::new(
        embedder,
        qdrant,
        openai,
        config.qdrant.collection_name.clone(),
    ))
}

/// Start the HTTP API
#[inline]
pub async fn serve(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    let assistant = Arc::new(build_assistant(&config)?);

    info!(
        "Serving collection {} with chat model {}",
        config.qdrant.collection_name, config.openai.chat_model
    );
    eprintln!(
        "{} {}",
        style("🚀 Starting API on").bold().green(),
        style(format!("http://{}", config.server.bind_address())).cyan()
    );

    server::serve(assistant, &config.server).await
}

/// Chunk, embed and store every chapter of the textbook
#[inline]
pub async fn ingest_docs(config_dir: &Path, docs_dir: Option<&Path>) -> Result<()> {
    let config = Config::load(config_dir)?;
    let working_dir = std::env::current_dir().context("Failed to read current directory")?;
    let docs_dir = resolve_docs_dir(docs_dir, &working_dir)?;

    eprintln!(
        "{} {}",
        style("📚 Ingesting textbook from").bold().cyan(),
        style(docs_dir.display()).dim()
    );

    let openai = Arc::new(
        OpenAiClient::new(&config.openai).context("Failed to initialize OpenAI client")?,
    );
    let qdrant =
        Arc::new(QdrantClient::new(&config.qdrant).context("Failed to initialize Qdrant client")?);
    let ingestor = Ingestor::new(openai, qdrant, config.qdrant.collection_name.clone())
        .with_progress(console::user_attended_stderr());

    let stats = tokio::task::spawn_blocking(move || ingestor.run(&docs_dir))
        .await
        .context("Ingestion task panicked")??;

    eprintln!("{}", style("✅ Ingestion complete").bold().green());
    eprintln!("  Files processed: {}", style(stats.files_processed).cyan());
    eprintln!("  Chunks created: {}", style(stats.chunks_created).cyan());
    eprintln!("  Chunks embedded: {}", style(stats.chunks_embedded).cyan());
    eprintln!("  Points stored: {}", style(stats.points_upserted).cyan());
    if stats.failures > 0 {
        eprintln!("  Failures: {}", style(stats.failures).red());
    }
    eprintln!(
        "  Collection: {}",
        style(&config.qdrant.collection_name).cyan()
    );

    Ok(())
}

/// Print the effective configuration with secrets masked
#[inline]
pub fn print_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    show_config(&config);
    Ok(())
}
