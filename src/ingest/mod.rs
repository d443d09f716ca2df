// Ingestion module
// Turns the source PDF into a populated vector index, once per process

pub mod chunking;
pub mod document;


use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::index::{IndexError, IndexHandle, VectorIndex};
use crate::provider::Embedder;

pub use chunking::{Chunk, ChunkingConfig, ChunkingError, chunk_text};
pub use document::{Document, PdfExtractor, TextExtractor, join_pages};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Document not found: {}", path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("Failed to read document {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document is not a readable PDF: {0}")]
    UnparseablePdf(String),

    #[error("Document contains no extractable text")]
    NoExtractableText,

    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Embedding provider failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("Embedding provider returned unusable vectors: {0}")]
    InvalidEmbeddings(#[from] IndexError),
}

/// Summary of a completed ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Reads, chunks and embeds the source document into a `VectorIndex`
pub struct Ingestor {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl Ingestor {
    #[inline]
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            extractor,
            embedder,
            chunking,
        }
    }

    /// Ingestor for PDF documents
    #[inline]
    pub fn for_pdf(embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self::new(Arc::new(PdfExtractor), embedder, chunking)
    }

    /// Build an index from the document at `path`
    #[inline]
    pub async fn ingest(&self, path: &Path) -> Result<(VectorIndex, IngestReport), IngestError> {
        let document = Document::load(path).await?;
        let pages = self.extractor.extract_pages(document.bytes).await?;
        let text = join_pages(&pages);

        debug!(
            "Extracted {} characters from {} pages of {}",
            text.chars().count(),
            pages.len(),
            path.display()
        );

        let index = self.index_text(&text).await?;
        let report = IngestReport {
            pages: pages.len(),
            chunks: index.len(),
            dimension: index.dimension(),
        };

        Ok((index, report))
    }

    /// Chunk and embed already extracted text
    #[inline]
    pub async fn index_text(&self, text: &str) -> Result<VectorIndex, IngestError> {
        if text.trim().is_empty() {
            return Err(IngestError::NoExtractableText);
        }

        let chunks = chunk_text(text, &self.chunking)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        debug!("Embedding {} chunks", texts.len());
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(IngestError::Embedding)?;

        Ok(VectorIndex::build(chunks, vectors)?)
    }

    /// Run ingestion and publish the result into `handle`.
    ///
    /// On failure nothing partial is published; the handle is marked failed
    /// unless it already serves an earlier index.
    #[inline]
    pub async fn ingest_into(
        &self,
        path: &Path,
        handle: &IndexHandle,
    ) -> Result<IngestReport, IngestError> {
        let started = Instant::now();

        match self.ingest(path).await {
            Ok((index, report)) => {
                handle.publish(index).await;
                info!(
                    "Embedded {} chunks ({} pages, dimension {}) from {} in {:.1?}",
                    report.chunks,
                    report.pages,
                    report.dimension,
                    path.display(),
                    started.elapsed()
                );
                Ok(report)
            }
            Err(e) => {
                error!("Failed to ingest {}: {}", path.display(), e);
                handle.mark_failed(e.to_string()).await;
                Err(e)
            }
        }
    }
}
