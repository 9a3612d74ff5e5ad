//! Generation Orchestrator — the single entry point for roadmap generation.
//!
//! Flow: sanitize → rate-limit check → cache lookup → (miss) model call →
//!       extract → normalize → cache store → return.
//!
//! The cache is read before the model call and written after it, each in its
//! own short critical section. Nothing is cached unless the whole pipeline
//! succeeds, so a dropped request leaves no partial state behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::cache::ResponseCache;
use crate::generation::extractor::extract_object;
use crate::generation::fallback::{career_label, placeholder_document};
use crate::generation::normalizer::{normalize, SchemaProfile};
use crate::generation::rate_limiter::RateLimiter;
use crate::generation::sanitizer::{prompt_hash, PromptSanitizer};
use crate::llm_client::prompts::{build_roadmap_prompt, ROADMAP_SYSTEM};
use crate::llm_client::ModelClient;
use crate::models::roadmap::{GeneratedRoadmap, RoadmapDocument};

/// Behavioural switches for the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub max_prompt_length: usize,
    pub schema_profile: SchemaProfile,
    pub fallback_enabled: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_prompt_length: crate::generation::sanitizer::DEFAULT_MAX_PROMPT_LENGTH,
            schema_profile: SchemaProfile::Lenient,
            fallback_enabled: false,
        }
    }
}

/// Extracts and normalizes a roadmap from free-form text.
pub fn document_from_text(text: &str, profile: SchemaProfile) -> Result<RoadmapDocument, AppError> {
    let object = extract_object(text)?;
    normalize(object, profile)
}

pub struct GenerationOrchestrator {
    sanitizer: PromptSanitizer,
    rate_limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    model: Arc<dyn ModelClient>,
    settings: GenerationSettings,
}

impl GenerationOrchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        rate_limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            sanitizer: PromptSanitizer::new(settings.max_prompt_length),
            rate_limiter,
            cache,
            model,
            settings,
        }
    }

    /// Wires the cache and rate limiter from configuration.
    pub fn from_config(config: &Config, model: Arc<dyn ModelClient>) -> Self {
        let cache = Arc::new(ResponseCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_size,
        ));
        let rate_limiter = Arc::new(RateLimiter::new(
            Duration::from_secs(config.rate_limit_window_secs),
            config.rate_limit_max_requests,
        ));
        Self::new(
            model,
            rate_limiter,
            cache,
            GenerationSettings {
                max_prompt_length: config.max_prompt_length,
                schema_profile: config.schema_profile,
                fallback_enabled: config.fallback_enabled,
            },
        )
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn model(&self) -> &dyn ModelClient {
        self.model.as_ref()
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Runs the full pipeline for one request from `client_identity`.
    pub async fn generate(
        &self,
        client_identity: &str,
        raw_prompt: &str,
    ) -> Result<GeneratedRoadmap, AppError> {
        let prompt = self.sanitizer.sanitize(raw_prompt)?;
        let span = info_span!(
            "generate",
            request_id = %Uuid::new_v4(),
            prompt_hash = %prompt_hash(&prompt)
        );

        self.run(client_identity, prompt).instrument(span).await
    }

    async fn run(&self, client_identity: &str, prompt: String) -> Result<GeneratedRoadmap, AppError> {
        self.rate_limiter.check(client_identity)?;

        if let Some(hit) = self.cache.get(&prompt) {
            debug!("Cache hit");
            return Ok(GeneratedRoadmap {
                document: hit.document,
                cached: true,
                degraded: false,
                generation_time_ms: None,
                generated_at: hit.generated_at,
            });
        }

        debug!("Cache miss; calling model");
        let started = Instant::now();

        let raw = match self
            .model
            .generate(&build_roadmap_prompt(&prompt), ROADMAP_SYSTEM)
            .await
        {
            Ok(raw) => raw,
            Err(e) if e.is_unavailable() => {
                if self.settings.fallback_enabled {
                    warn!(error = %e, "Model unavailable; serving degraded placeholder");
                    return Ok(self.placeholder(&prompt));
                }
                return Err(AppError::ModelUnavailable(e.to_string()));
            }
            Err(e) => {
                warn!(error = ?e, "Model invocation failed");
                return Err(AppError::ModelInvocation {
                    credential_or_quota: e.is_credential_or_quota(),
                    message: e.to_string(),
                });
            }
        };

        debug!(chars = raw.len(), "Extracting roadmap from model output");
        let document = document_from_text(&raw, self.settings.schema_profile)?;

        let generated_at = Utc::now();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.cache.put(prompt, document.clone(), generated_at);

        info!(
            generation_time_ms = elapsed_ms,
            resources = document.learning_resources.len(),
            "Roadmap generated"
        );

        Ok(GeneratedRoadmap {
            document,
            cached: false,
            degraded: false,
            generation_time_ms: Some(elapsed_ms),
            generated_at,
        })
    }

    fn placeholder(&self, prompt: &str) -> GeneratedRoadmap {
        GeneratedRoadmap {
            document: placeholder_document(&career_label(prompt)),
            cached: false,
            degraded: true,
            generation_time_ms: None,
            generated_at: Utc::now(),
        }
    }
}
