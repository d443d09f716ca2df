use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{Config, get_config_dir};
use crate::index::IndexHandle;
use crate::ingest::Ingestor;
use crate::provider::{CompletionProvider, Embedder, OpenAiClient};
use crate::query::QueryHandler;
use crate::server::{self, AppState};
use crate::{PolicyChatError, Result};

/// Command line overrides applied on top of the file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_dir: Option<PathBuf>,
    pub document: Option<PathBuf>,
    pub port: Option<u16>,
}

/// Resolve the effective configuration: file, then environment, then flags
#[inline]
pub fn load_config(overrides: &Overrides) -> Result<Config> {
    let config_dir = match &overrides.config_dir {
        Some(dir) => dir.clone(),
        None => get_config_dir()?,
    };

    let mut config = Config::load_with_env(&config_dir)?;
    if let Some(document) = &overrides.document {
        config.server.document_path = document.clone();
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }
    config.validate()?;

    Ok(config)
}

/// Ingest the policy document, then serve questions over HTTP until Ctrl-C
#[inline]
pub async fn serve(overrides: &Overrides) -> Result<()> {
    let config = load_config(overrides)?;
    config.require_api_key()?;

    let client = Arc::new(
        OpenAiClient::new(&config.provider)?.with_timeout(provider_call_timeout(&config)),
    );
    let index = IndexHandle::new();

    let ingestor = Ingestor::for_pdf(
        Arc::clone(&client) as Arc<dyn Embedder>,
        config.chunking,
    );
    if let Err(e) = ingestor
        .ingest_into(&config.server.document_path, &index)
        .await
    {
        warn!(
            "Serving without a knowledge base, questions will fail until restart: {}",
            e
        );
    }

    let handler = QueryHandler::new(
        index,
        Arc::clone(&client) as Arc<dyn Embedder>,
        client as Arc<dyn CompletionProvider>,
    )
    .with_top_k(config.server.top_k)
    .with_request_timeout(Duration::from_secs(config.server.request_timeout_seconds));

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| {
            PolicyChatError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind {}: {}", address, e),
            ))
        })?;

    server::serve(listener, AppState::new(handler), shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Per-attempt provider timeout while serving.
///
/// A request that times out drops its blocking task but not the `ureq` call
/// inside it, so a single attempt never outlives the request budget.
fn provider_call_timeout(config: &Config) -> Duration {
    Duration::from_secs(
        config
            .provider
            .timeout_seconds
            .min(config.server.request_timeout_seconds),
    )
}

/// Run the ingestion pipeline once and report what it produced
#[inline]
pub async fn ingest_only(overrides: &Overrides) -> Result<()> {
    let config = load_config(overrides)?;
    config.require_api_key()?;

    let client = Arc::new(OpenAiClient::new(&config.provider)?);
    let ingestor = Ingestor::for_pdf(client, config.chunking);

    let path = &config.server.document_path;
    let (_, report) = ingestor.ingest(path).await?;

    println!("Ingested {}", path.display());
    println!("  Pages: {}", report.pages);
    println!("  Chunks: {}", report.chunks);
    println!("  Embedding dimension: {}", report.dimension);

    Ok(())
}

/// Print the effective configuration with the API key masked
#[inline]
pub fn show_config(overrides: &Overrides) -> Result<()> {
    let config = load_config(overrides)?;
    let rendered = render_config(&config).map_err(anyhow::Error::from)?;
    print!("{}", rendered);
    Ok(())
}

fn render_config(config: &Config) -> std::result::Result<String, std::fmt::Error> {
    let provider = &config.provider;
    let server = &config.server;
    let api_key = provider
        .api_key
        .as_deref()
        .map_or_else(|| "(not set)".to_string(), mask_secret);

    let mut out = String::new();
    writeln!(out, "Provider Settings:")?;
    writeln!(out, "  Base URL: {}", provider.base_url)?;
    writeln!(out, "  API Key: {}", api_key)?;
    writeln!(out, "  Embedding Model: {}", provider.embedding_model)?;
    writeln!(out, "  Completion Model: {}", provider.completion_model)?;
    writeln!(out, "  Temperature: {}", provider.temperature)?;
    writeln!(out, "  Batch Size: {}", provider.batch_size)?;
    writeln!(out, "  Timeout: {}s", provider.timeout_seconds)?;
    writeln!(out, "  Retry Attempts: {}", provider.retry_attempts)?;
    writeln!(out)?;
    writeln!(out, "Chunking Settings:")?;
    writeln!(out, "  Chunk Size: {}", config.chunking.chunk_size)?;
    writeln!(out, "  Chunk Overlap: {}", config.chunking.chunk_overlap)?;
    writeln!(out)?;
    writeln!(out, "Server Settings:")?;
    writeln!(out, "  Listen: {}", server.bind_address())?;
    writeln!(out, "  Document: {}", server.document_path.display())?;
    writeln!(out, "  Top K: {}", server.top_k)?;
    writeln!(out, "  Request Timeout: {}s", server.request_timeout_seconds)?;
    writeln!(out)?;
    writeln!(out, "Config file: {}", config.config_file_path().display())?;
    Ok(out)
}

/// Keep the last four characters of a secret visible
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
