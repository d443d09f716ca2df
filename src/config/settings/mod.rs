#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::ingest::chunking::{ChunkingConfig, ChunkingError};

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DOCUMENT: &str = "POLICY_DOCUMENT";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub completion_model: String,
    pub temperature: f32,
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/".to_string(),
            api_key: None,
            embedding_model: "text-embedding-ada-002".to_string(),
            completion_model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            batch_size: 512,
            timeout_seconds: 30,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub document_path: PathBuf,
    pub top_k: usize,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            document_path: PathBuf::from("docs/hr_policies.pdf"),
            top_k: 4,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid protocol in {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(String),
    #[error("Invalid model name for {0} (cannot be empty)")]
    InvalidModel(&'static str),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid temperature: {0} (must be between 0 and 2)")]
    InvalidTemperature(f32),
    #[error("Invalid timeout: {0} seconds (must be between 1 and 600)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid chunk size: {0} (must be between 100 and 8000)")]
    InvalidChunkSize(usize),
    #[error("Invalid chunking configuration: {0}")]
    Chunking(#[from] ChunkingError),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Document path cannot be empty")]
    EmptyDocumentPath,
    #[error("No API key configured; set OPENAI_API_KEY or provider.api_key")]
    MissingApiKey,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load `config.toml` from the given directory, falling back to defaults
    /// when the file does not exist. Environment overrides are not applied.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();

        Ok(config)
    }

    /// Load from the config directory, apply process environment overrides and validate
    #[inline]
    pub fn load_with_env<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let mut config = Self::load(config_dir)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Default configuration directory, `~/.policy-chat`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".policy-chat"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Apply overrides from an environment lookup
    #[inline]
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.provider.api_key = Some(api_key);
        }

        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.provider.base_url = base_url;
        }

        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }

        if let Some(document) = lookup(ENV_DOCUMENT).filter(|v| !v.trim().is_empty()) {
            self.server.document_path = PathBuf::from(document);
        }

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.validate_chunking_config()?;
        self.server.validate()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(100..=8000).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        config.validate()?;
        Ok(())
    }

    /// The API key, required before any provider call is made
    #[inline]
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.provider
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("embedding_model"));
        }

        if self.completion_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel("completion_model"));
        }

        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// Base URL of the provider API, always ending in `/` so relative joins
    /// keep the version prefix
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let mut url_str = self.base_url.trim().to_string();
        if !url_str.ends_with('/') {
            url_str.push('/');
        }

        let url = Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(url_str));
        }

        Ok(url)
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }

        if !(1..=50).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(1..=600).contains(&self.request_timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.request_timeout_seconds));
        }

        if self.document_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDocumentPath);
        }

        Ok(())
    }

    /// Socket address string the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
