use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecommenderError>;

#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog load error: {0}")]
    CatalogLoad(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod catalog;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod evaluation;
pub mod recommender;
pub mod server;
pub mod trace;
