//! Local-model adapter over the Ollama chat API. Streams NDJSON chunks and
//! hands back the full accumulated text; nothing is parsed incrementally.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{accumulate_chunks, ModelClient, ModelError};
use crate::config::ModelConfig;

const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

/// Splits a byte stream into NDJSON lines and yields each line's content.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: BytesMut,
    done: bool,
}

impl NdjsonDecoder {
    /// Feeds raw bytes; returns the content of every complete line.
    pub fn push(&mut self, bytes: &[u8]) -> Result<String, ModelError> {
        self.buffer.extend_from_slice(bytes);
        let mut out = String::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(newline + 1);
            self.decode_line(&line, &mut out)?;
        }

        Ok(out)
    }

    /// Flushes a trailing line without a newline terminator.
    pub fn finish(&mut self) -> Result<String, ModelError> {
        let mut out = String::new();
        if self.buffer.has_remaining() {
            let line = self.buffer.split();
            self.decode_line(&line, &mut out)?;
        }
        Ok(out)
    }

    fn decode_line(&mut self, line: &[u8], out: &mut String) -> Result<(), ModelError> {
        let line = std::str::from_utf8(line)
            .map_err(|e| ModelError::Stream(format!("invalid UTF-8 in stream: {e}")))?
            .trim();
        if line.is_empty() || self.done {
            return Ok(());
        }

        let chunk: ChatChunk = serde_json::from_str(line)?;
        if let Some(error) = chunk.error {
            return Err(ModelError::Stream(error));
        }
        if let Some(message) = chunk.message {
            out.push_str(&message.content);
        }
        self.done = chunk.done;
        Ok(())
    }
}

pub struct OllamaClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            model: config.model_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: true,
            format: "json",
        };

        let mut request = self.client.post(self.url("/api/chat")).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut decoder = NdjsonDecoder::default();
        let pieces = response.bytes_stream().map(|chunk| match chunk {
            Ok(bytes) => decoder.push(&bytes),
            Err(e) => Err(ModelError::Http(e)),
        });
        let mut text = accumulate_chunks(pieces).await?;
        text.push_str(&decoder.finish()?);

        debug!(chars = text.len(), "Ollama stream complete");

        if text.trim().is_empty() {
            return Err(ModelError::EmptyContent);
        }
        Ok(text)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn provider(&self) -> &str {
        "ollama"
    }

    async fn probe(&self) -> Result<(), ModelError> {
        let response = self.client.get(self.url("/api/tags")).send().await?;
        if !response.status().is_success() {
            return Err(ModelError::Api {
                status: response.status().as_u16(),
                message: "Ollama server did not list models".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}
