use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbError>;

#[derive(Error, Debug)]
pub enum KbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod audit;
pub mod cache;
pub mod chunking;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
