/// LLM Client — the capability interface every generative backend sits behind.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// All model interactions go through `ModelClient`.
///
/// Backends are chosen at construction time from `ModelConfig` and built
/// lazily on first use, so a missing credential never blocks startup.
use std::sync::Arc;

use async_trait::async_trait;
use futures::{pin_mut, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::{ModelConfig, ModelProvider};

pub mod anthropic;
#[cfg(test)]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod prompts;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model client unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

const CREDENTIAL_OR_QUOTA_MARKERS: &[&str] = &[
    "api key",
    "api_key",
    "unauthorized",
    "authentication",
    "credential",
    "permission",
    "quota",
    "billing",
    "insufficient",
    "rate limit",
];

impl ModelError {
    /// True when the backend cannot be reached at all: construction failed
    /// or the connection was refused. Eligible for degraded-mode fallback.
    pub fn is_unavailable(&self) -> bool {
        match self {
            ModelError::Unavailable(_) => true,
            ModelError::Http(e) => e.is_connect(),
            _ => false,
        }
    }

    /// True for auth or quota exhaustion, which callers see as 503 rather
    /// than 500.
    pub fn is_credential_or_quota(&self) -> bool {
        if let ModelError::Api { status, .. } = self {
            if matches!(status, 401 | 402 | 403 | 429) {
                return true;
            }
        }
        let message = self.to_string().to_lowercase();
        CREDENTIAL_OR_QUOTA_MARKERS
            .iter()
            .any(|marker| message.contains(marker))
    }
}

/// Sends a prompt to a generative backend and returns its raw text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, ModelError>;

    fn model_id(&self) -> &str;

    fn provider(&self) -> &str;

    /// Cheap readiness check. Defaults to success for single-shot HTTP
    /// backends, which have nothing to check before the first call.
    async fn probe(&self) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Concatenates every chunk of a streamed response. Dropping the returned
/// future abandons the stream.
pub async fn accumulate_chunks<S>(stream: S) -> Result<String, ModelError>
where
    S: Stream<Item = Result<String, ModelError>>,
{
    pin_mut!(stream);
    let mut text = String::new();
    while let Some(piece) = stream.next().await {
        text.push_str(&piece?);
    }
    Ok(text)
}

/// Builds the concrete adapter for the configured provider.
pub fn build_client(config: &ModelConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
    let client: Arc<dyn ModelClient> = match config.provider {
        ModelProvider::OpenAi => Arc::new(OpenAiClient::new(config)?),
        ModelProvider::Ollama => Arc::new(OllamaClient::new(config)?),
        ModelProvider::Anthropic => Arc::new(AnthropicClient::new(config)?),
    };
    Ok(client)
}

/// Defers adapter construction to the first call. A failed construction is
/// reported as `Unavailable` and attempted again on the next call; a
/// successful one is kept for the life of the process.
pub struct LazyModelClient {
    config: ModelConfig,
    client: OnceCell<Arc<dyn ModelClient>>,
}

impl LazyModelClient {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Arc<dyn ModelClient>, ModelError> {
        self.client
            .get_or_try_init(|| async {
                let client = build_client(&self.config)?;
                info!(
                    "Model client initialized (provider: {}, model: {})",
                    client.provider(),
                    client.model_id()
                );
                Ok(client)
            })
            .await
    }
}

#[async_trait]
impl ModelClient for LazyModelClient {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, ModelError> {
        self.client()
            .await?
            .generate(prompt, system_instruction)
            .await
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn provider(&self) -> &str {
        self.config.provider.as_str()
    }

    async fn probe(&self) -> Result<(), ModelError> {
        self.client().await?.probe().await
    }
}
