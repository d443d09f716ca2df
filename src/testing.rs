//! Deterministic stand-ins for the external collaborators, shared by unit tests

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::ingest::{IngestError, TextExtractor};
use crate::provider::{CompletionProvider, Embedder, Prompt};

pub const DIMENSION: usize = 64;

/// Bag-of-words embedder: each lowercase word bumps one hashed bucket
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn vector_for(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                % DIMENSION;
            vector[bucket] += 1.0;
        }
        vector
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

/// Embedder that always fails, as an unreachable provider would
#[derive(Debug, Default)]
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("Client error: HTTP 401"))
    }
}

/// Embedder that drops the last vector of every request
#[derive(Debug, Default)]
pub struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .skip(1)
            .map(|t| KeywordEmbedder::vector_for(t))
            .collect())
    }
}

/// Embedder whose vectors never match the index dimension
#[derive(Debug, Default)]
pub struct WrongDimensionEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for WrongDimensionEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Extractor returning fixed pages regardless of input bytes
#[derive(Debug, Default)]
pub struct StaticExtractor {
    pub pages: Vec<String>,
}

impl StaticExtractor {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract_pages(&self, _bytes: Vec<u8>) -> Result<Vec<String>, IngestError> {
        Ok(self.pages.clone())
    }
}

/// Completion provider that answers with a fixed string and records prompts
#[derive(Debug)]
pub struct CannedCompletion {
    pub answer: String,
    pub calls: AtomicUsize,
    pub last_prompt: Mutex<Option<Prompt>>,
}

impl CannedCompletion {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.last_prompt
            .lock()
            .expect("prompt lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CompletionProvider for CannedCompletion {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().expect("prompt lock poisoned") = Some(prompt.clone());
        Ok(self.answer.clone())
    }
}

/// Completion provider failing with an internal-looking message
#[derive(Debug, Default)]
pub struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        Err(anyhow!(
            "Request error: connection refused (https://llm.internal:8443/v1/chat/completions)"
        ))
    }
}

/// Completion provider that never answers within a test's timeout
#[derive(Debug, Default)]
pub struct StalledCompletion;

#[async_trait]
impl CompletionProvider for StalledCompletion {
    async fn complete(&self, _prompt: &Prompt) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}
