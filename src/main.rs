use clap::{Parser, Subcommand};
use std::path::PathBuf;
use textbook_rag::Result;
use textbook_rag::commands::{ingest_docs, print_config, serve};

#[derive(Parser)]
#[command(name = "textbook-rag")]
#[command(about = "Question answering API over a markdown textbook")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve,
    /// Chunk, embed and store the textbook chapters
    Ingest {
        /// Directory of chapter markdown files. Defaults to ../docs, then ./docs
        #[arg(long)]
        docs_dir: Option<PathBuf>,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            serve(&cli.config_dir).await?;
        }
        Commands::Ingest { docs_dir } => {
            ingest_docs(&cli.config_dir, docs_dir.as_deref()).await?;
        }
        Commands::Config => {
            print_config(&cli.config_dir)?;
        }
    }

    Ok(())
}
