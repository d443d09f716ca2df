// Vector index module
// In-memory similarity search and the shared readiness state around it


pub mod state;

use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

use crate::ingest::chunking::Chunk;

pub use state::{IndexHandle, IndexState, IndexStatus, NotReady};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Cannot build an index without chunks")]
    Empty,
    #[error("Got {vectors} vectors for {chunks} chunks")]
    CountMismatch { chunks: usize, vectors: usize },
    #[error("Vector for chunk {chunk_index} is empty")]
    EmptyVector { chunk_index: usize },
    #[error("Vector for chunk {chunk_index} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        chunk_index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Query vector has {actual} dimensions, index has {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// Immutable collection of chunks and their embeddings
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
}

/// A chunk returned from a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity_score: f32,
}

impl VectorIndex {
    /// Pair every chunk with its vector. All vectors must share one non-zero dimension.
    #[inline]
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }

        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors[0].len();
        let mut entries = Vec::with_capacity(chunks.len());

        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.is_empty() {
                return Err(IndexError::EmptyVector {
                    chunk_index: chunk.chunk_index,
                });
            }
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    chunk_index: chunk.chunk_index,
                    expected: dimension,
                    actual: vector.len(),
                });
            }

            let norm = l2_norm(&vector);
            entries.push(IndexEntry {
                chunk,
                vector,
                norm,
            });
        }

        debug!(
            "Built vector index with {} entries of dimension {}",
            entries.len(),
            dimension
        );

        Ok(Self { entries, dimension })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Chunks in document order
    #[inline]
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|entry| &entry.chunk)
    }

    /// Return up to `limit` chunks ranked by descending cosine similarity.
    ///
    /// Ties keep document order. A query whose dimension differs from the
    /// index is rejected rather than ranked.
    #[inline]
    pub fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, IndexError> {
        if query_vector.len() != self.dimension {
            return Err(IndexError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let query_norm = l2_norm(query_vector);

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query_vector, query_norm, entry), entry))
            .collect();

        // sort_by is stable, so equal scores stay in document order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(similarity_score, entry)| SearchResult {
                chunk: entry.chunk.clone(),
                similarity_score,
            })
            .collect())
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_similarity(query: &[f32], query_norm: f32, entry: &IndexEntry) -> f32 {
    if query.len() != entry.vector.len() || query_norm == 0.0 || entry.norm == 0.0 {
        return 0.0;
    }

    let dot: f32 = query
        .iter()
        .zip(entry.vector.iter())
        .map(|(a, b)| a * b)
        .sum();
    let score = dot / (query_norm * entry.norm);

    if score.is_nan() { 0.0 } else { score }
}
