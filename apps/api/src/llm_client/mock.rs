//! Scripted model client for tests. Counts invocations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ModelClient, ModelError};

#[derive(Debug, Clone)]
enum Behavior {
    Text(String),
    Unavailable,
    ApiError { status: u16, message: String },
}

#[derive(Debug)]
pub struct MockModelClient {
    behavior: Behavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockModelClient {
    pub fn returning(text: impl Into<String>) -> Self {
        Self::with(Behavior::Text(text.into()))
    }

    pub fn unavailable() -> Self {
        Self::with(Behavior::Unavailable)
    }

    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::with(Behavior::ApiError {
            status,
            message: message.into(),
        })
    }

    /// Sleeps (on the tokio clock) before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(&self, _prompt: &str, _system_instruction: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Text(text) => Ok(text.clone()),
            Behavior::Unavailable => Err(ModelError::Unavailable("MODEL_API_KEY is not set".to_string())),
            Behavior::ApiError { status, message } => Err(ModelError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    fn provider(&self) -> &str {
        "mock"
    }
}
