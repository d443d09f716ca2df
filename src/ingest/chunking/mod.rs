
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A contiguous slice of the extracted document text, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text
    pub content: String,
    /// Position of this chunk in the document's chunk sequence
    pub chunk_index: usize,
    /// Offset of the first character in the source text, counted in chars
    pub start_offset: usize,
}

impl Chunk {
    /// Length of the chunk in characters
    #[inline]
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Configuration for splitting text into overlapping chunks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk length in characters
    pub chunk_size: usize,
    /// Number of characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ChunkingError> {
        if self.chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive chunks
    #[inline]
    pub fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split text into fixed-size windows that overlap by `chunk_overlap` characters.
///
/// Windows are measured in Unicode scalar values so multi-byte text is never
/// cut inside a character. Every chunk except the last is exactly
/// `chunk_size` characters long, and the last one always ends at the end of
/// the text. Whitespace-only input yields no chunks.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<Chunk>, ChunkingError> {
    config.validate()?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let step = config.step();
    let mut chunks = Vec::with_capacity(chars.len() / step + 1);
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(chars.len());
        chunks.push(Chunk {
            content: chars[start..end].iter().collect(),
            chunk_index: chunks.len(),
            start_offset: start,
        });

        if end == chars.len() {
            break;
        }
        start += step;
    }

    debug!(
        "Split {} characters into {} chunks (size {}, overlap {})",
        chars.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    Ok(chunks)
}
