use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::VectorIndex;

/// Readiness of the shared index
#[derive(Debug, Clone, Default)]
pub enum IndexState {
    /// Ingestion has not finished yet
    #[default]
    Pending,
    Ready(Arc<VectorIndex>),
    /// Ingestion failed; the reason is kept for operators, not for clients
    Failed { reason: String },
}

/// Why the index cannot serve a query
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum NotReady {
    #[error("the policy index is still being built")]
    Pending,
    #[error("the policy index could not be built")]
    Failed,
}

/// Snapshot of the index state for health reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    Pending,
    Ready { chunks: usize, dimension: usize },
    Failed { reason: String },
}

/// Cloneable owner of the process-wide index, injected into request handlers
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    state: Arc<RwLock<IndexState>>,
}

impl IndexHandle {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that is ready from the start
    #[inline]
    pub fn with_index(index: VectorIndex) -> Self {
        Self {
            state: Arc::new(RwLock::new(IndexState::Ready(Arc::new(index)))),
        }
    }

    /// Swap in a fully built index, returning the one it replaces
    #[inline]
    pub async fn publish(&self, index: VectorIndex) -> Option<Arc<VectorIndex>> {
        let chunks = index.len();
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut *state, IndexState::Ready(Arc::new(index)));
        info!("Published vector index with {} chunks", chunks);

        match previous {
            IndexState::Ready(old) => Some(old),
            IndexState::Pending | IndexState::Failed { .. } => None,
        }
    }

    /// Record an ingestion failure.
    ///
    /// A handle that already serves an index keeps it; returns whether the
    /// state changed to `Failed`.
    #[inline]
    pub async fn mark_failed(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let mut state = self.state.write().await;

        if matches!(*state, IndexState::Ready(_)) {
            warn!(
                "Re-ingestion failed, keeping the current index: {}",
                reason
            );
            return false;
        }

        *state = IndexState::Failed { reason };
        true
    }

    /// The current index, or why there is none
    #[inline]
    pub async fn ready(&self) -> Result<Arc<VectorIndex>, NotReady> {
        match &*self.state.read().await {
            IndexState::Ready(index) => Ok(Arc::clone(index)),
            IndexState::Pending => Err(NotReady::Pending),
            IndexState::Failed { .. } => Err(NotReady::Failed),
        }
    }

    #[inline]
    pub async fn status(&self) -> IndexStatus {
        match &*self.state.read().await {
            IndexState::Pending => IndexStatus::Pending,
            IndexState::Ready(index) => IndexStatus::Ready {
                chunks: index.len(),
                dimension: index.dimension(),
            },
            IndexState::Failed { reason } => IndexStatus::Failed {
                reason: reason.clone(),
            },
        }
    }
}
