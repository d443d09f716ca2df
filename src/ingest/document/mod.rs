
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::IngestError;

/// Separator inserted between the text of consecutive pages
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Raw bytes of a source document, dropped once its text is extracted
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Read a document from disk
    #[inline]
    pub async fn load(path: &Path) -> Result<Self, IngestError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => IngestError::DocumentNotFound {
                path: path.to_path_buf(),
            },
            _ => IngestError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        debug!("Read {} bytes from {}", bytes.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }
}

/// Turns document bytes into page-ordered plain text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<String>, IngestError>;
}

/// PDF text extraction backed by `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<String>, IngestError> {
        // pdf-extract is CPU bound and panics on some malformed inputs, so it
        // runs on the blocking pool where a panic surfaces as a join error.
        let pages =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
                .await
                .map_err(|e| IngestError::UnparseablePdf(format!("extractor aborted: {}", e)))?
                .map_err(|e| IngestError::UnparseablePdf(e.to_string()))?;

        debug!("Extracted text from {} PDF pages", pages.len());
        Ok(pages)
    }
}

/// Join extracted pages into one document text
#[inline]
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| normalize_page(page))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Strip trailing whitespace from each line and collapse runs of blank lines
fn normalize_page(page: &str) -> String {
    let mut normalized = String::with_capacity(page.len());
    let mut blank_run = 0;

    for line in page.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        normalized.push_str(line);
        normalized.push('\n');
    }

    normalized.trim().to_string()
}
