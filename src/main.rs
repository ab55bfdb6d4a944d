use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docs_chat::commands::{run_indexer, serve, show_config};

#[derive(Parser)]
#[command(name = "docs-chat")]
#[command(about = "A retrieval-augmented chatbot over your own documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a folder of documents into the vector index
    Index {
        /// Folder containing documents to index
        #[arg(long)]
        folder: Option<PathBuf>,
        /// Target index name (defaults to the configured index)
        #[arg(long)]
        index: Option<String>,
    },
    /// Start the HTTP chat server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { folder, index } => {
            tokio::task::spawn_blocking(move || run_indexer(folder, index)).await??;
        }
        Commands::Serve { port } => {
            serve(port).await?;
        }
        Commands::Config => {
            show_config()?;
        }
    }

    Ok(())
}
