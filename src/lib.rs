use thiserror::Error;

pub type Result<T> = std::result::Result<T, PolicyChatError>;

#[derive(Error, Debug)]
pub enum PolicyChatError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] ingest::IngestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod index;
pub mod ingest;
pub mod provider;
pub mod query;
pub mod server;

#[cfg(test)]
mod testing;
