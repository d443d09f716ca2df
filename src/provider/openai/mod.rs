
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::{CompletionProvider, Embedder, Prompt};
use crate::config::ProviderConfig;

const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Client for an OpenAI-compatible embeddings and chat completions API
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    completion_model: String,
    temperature: f32,
    batch_size: u32,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = config
            .endpoint_url()
            .context("Failed to parse provider base URL")?;

        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("No API key configured for the provider"))?;

        Ok(Self {
            base_url,
            api_key,
            embedding_model: config.embedding_model.clone(),
            completion_model: config.completion_model.clone(),
            temperature: config.temperature,
            batch_size: config.batch_size,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            retry_attempts: config.retry_attempts,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Generate embeddings for all texts, split into provider-sized batches
    #[inline]
    pub fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1) as usize) {
            let batch_vectors = self
                .generate_embeddings_single_batch(batch)
                .with_context(|| format!("Failed to process batch of {} texts", batch.len()))?;
            vectors.extend(batch_vectors);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    fn generate_embeddings_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let url = self
            .base_url
            .join("embeddings")
            .context("Failed to build embeddings URL")?;

        let response_text = self
            .post_json_with_retry(&url, &request_json)
            .context("Failed to generate embeddings")?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text)
            .context("Failed to parse embeddings response")?;

        if response.data.len() != texts.len() {
            return Err(anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            ));
        }

        // The API does not promise response order; `index` refers to the input position.
        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        if data.iter().enumerate().any(|(i, item)| item.index != i) {
            return Err(anyhow!("Embeddings response has missing or duplicate indices"));
        }

        Ok(data.into_iter().map(|item| item.embedding).collect())
    }

    /// Ask the chat completions endpoint to answer a rendered prompt
    #[inline]
    pub fn generate_completion(&self, prompt: &str) -> Result<String> {
        debug!("Requesting completion (prompt length: {})", prompt.len());

        let request = ChatRequest {
            model: &self.completion_model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize completion request")?;

        let url = self
            .base_url
            .join("chat/completions")
            .context("Failed to build completions URL")?;

        let response_text = self
            .post_json_with_retry(&url, &request_json)
            .context("Failed to generate completion")?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .context("Failed to parse completion response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow!("Completion response contained no text"))
    }

    fn post_json_with_retry(&self, url: &Url, body: &str) -> Result<String> {
        let authorization = format!("Bearer {}", self.api_key);
        self.make_request_with_retry(|| {
            self.agent
                .post(url.as_str())
                .header("Authorization", &authorization)
                .header("Content-Type", "application/json")
                .send(body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    match &error {
                        ureq::Error::StatusCode(status) if *status >= 500 || *status == 429 => {
                            warn!(
                                "Provider returned status {}, attempt {}/{}",
                                status, attempt, self.retry_attempts
                            );
                        }
                        ureq::Error::StatusCode(status) => {
                            warn!("Client error (status {}), not retrying", status);
                            return Err(anyhow!("Client error: HTTP {}", status));
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            return Err(anyhow!("Non-retryable error: {}", error));
                        }
                    }

                    last_error = Some(anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay = Duration::from_millis(
                            EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000,
                        );
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow!("Request failed after retries")))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || client.generate_embeddings(&texts))
            .await
            .context("Embedding task panicked")?
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let client = self.clone();
        let rendered = prompt.render();
        tokio::task::spawn_blocking(move || client.generate_completion(&rendered))
            .await
            .context("Completion task panicked")?
    }
}
