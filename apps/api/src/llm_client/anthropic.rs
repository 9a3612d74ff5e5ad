//! Cloud-model adapter over the Anthropic Messages API. Single-shot.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ModelClient, ModelError};
use crate::config::ModelConfig;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AnthropicResponse {
    /// Concatenates every text block in order.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ModelError::Unavailable("MODEL_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            model: config.model_id.clone(),
        })
    }

    async fn call(&self, prompt: &str, system: &str) -> Result<AnthropicResponse, ModelError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let response: AnthropicResponse = response.json().await?;

        debug!(
            "Anthropic call succeeded: input_tokens={}, output_tokens={}",
            response.usage.input_tokens, response.usage.output_tokens
        );

        Ok(response)
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, ModelError> {
        self.call(prompt, system_instruction)
            .await?
            .text()
            .ok_or(ModelError::EmptyContent)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "anthropic"
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelProvider;

    fn config(api_key: Option<&str>) -> ModelConfig {
        ModelConfig {
            provider: ModelProvider::Anthropic,
            model_id: "claude-sonnet-4-5".to_string(),
            api_key: api_key.map(str::to_string),
            base_url: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        assert!(matches!(
            AnthropicClient::new(&config(None)),
            Err(ModelError::Unavailable(_))
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = AnthropicClient::new(&config(Some("sk-ant-secret"))).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-ant-secret"));
        assert_eq!(client.model_id(), "claude-sonnet-4-5");
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "{\"title\":"},
                {"type": "tool_use"},
                {"type": "text", "text": " \"X\"}"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"title\": \"X\"}"));
    }

    #[test]
    fn test_blank_response_has_no_text() {
        let json = r#"{"content": [{"type": "text", "text": "  "}], "usage": {"input_tokens": 1, "output_tokens": 0}}"#;
        let response: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert!(response.text().is_none());
    }
}
