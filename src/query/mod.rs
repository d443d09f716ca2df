// Query module
// Answers questions from the shared index and the completion provider


use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::index::{IndexHandle, NotReady, SearchResult};
use crate::provider::{CompletionProvider, Embedder, Prompt};

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Missing question")]
    EmptyQuestion,

    #[error("Knowledge base is not ready: {0}")]
    NotReady(#[from] NotReady),

    #[error("Provider call failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("Provider calls did not finish within {0:?}")]
    Timeout(Duration),
}

/// An answer together with the context it was generated from
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}

/// Retrieval-augmented question answering over the shared index
pub struct QueryHandler {
    index: IndexHandle,
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionProvider>,
    top_k: usize,
    request_timeout: Duration,
}

impl QueryHandler {
    #[inline]
    pub fn new(
        index: IndexHandle,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            index,
            embedder,
            completion,
            top_k: DEFAULT_TOP_K,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[inline]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[inline]
    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Answer a question; the provider's text is returned unmodified
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<Answer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let index = self.index.ready().await?;

        // On timeout the caller gets an error right away; a blocking provider
        // call already in flight keeps running until its own agent timeout.
        tokio::time::timeout(self.request_timeout, async {
            let query_vector = self
                .embedder
                .embed(&[question.to_string()])
                .await
                .map_err(QueryError::Provider)?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    QueryError::Provider(anyhow::anyhow!("No embedding returned for question"))
                })?;

            let sources = index
                .search(&query_vector, self.top_k)
                .map_err(|e| QueryError::Provider(anyhow::Error::new(e)))?;
            debug!(
                "Retrieved {} chunks (best score {:.3})",
                sources.len(),
                sources.first().map_or(0.0, |s| s.similarity_score)
            );

            let prompt = Prompt::new(
                question,
                sources.iter().map(|s| s.chunk.content.clone()).collect(),
            );
            let text = self
                .completion
                .complete(&prompt)
                .await
                .map_err(QueryError::Provider)?;

            Ok::<_, QueryError>(Answer { text, sources })
        })
        .await
        .map_err(|_| QueryError::Timeout(self.request_timeout))?
    }
}
