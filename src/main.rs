use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kb_assist::commands::{App, config_command};

#[derive(Parser)]
#[command(name = "kb-assist")]
#[command(about = "A retrieval-augmented question answering assistant over a document knowledge base")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or inspect the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest a document into a knowledge base module
    Ingest {
        /// Module the document belongs to, e.g. "billing"
        module: String,
        /// Path to the document (.txt or .md)
        file: PathBuf,
        /// Language code of the document content
        #[arg(long, default_value = "en")]
        lang: String,
    },
    /// Ask a question against the knowledge base
    Query {
        /// The question text
        text: String,
        /// Language to answer in and to prefer when retrieving
        #[arg(long, default_value = "en")]
        lang: String,
        /// Module to search within
        #[arg(long, default_value = "")]
        module: String,
        /// Number of chunks to retrieve (defaults to the configured value)
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Delete a module's documents and cached answers
    DeleteModule {
        /// Module to delete
        module: String,
    },
    /// Show collection status
    Status,
    /// Show recent audit log entries
    Logs {
        /// Maximum number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            config_command(show)?;
        }
        Commands::Ingest { module, file, lang } => {
            App::init().await?.ingest(module, file, lang).await?;
        }
        Commands::Query {
            text,
            lang,
            module,
            top_k,
        } => {
            App::init().await?.query(text, lang, module, top_k).await?;
        }
        Commands::DeleteModule { module } => {
            App::init().await?.delete_module(module).await?;
        }
        Commands::Status => {
            App::init().await?.status().await?;
        }
        Commands::Logs { limit } => {
            App::init().await?.logs(limit).await?;
        }
    }

    Ok(())
}
