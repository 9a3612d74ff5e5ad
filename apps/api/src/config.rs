use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::generation::cache::{DEFAULT_MAX_SIZE, DEFAULT_TTL_SECS};
use crate::generation::normalizer::SchemaProfile;
use crate::generation::rate_limiter::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS};
use crate::generation::sanitizer::DEFAULT_MAX_PROMPT_LENGTH;

/// Which generative backend the lazy model client builds on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Ollama,
    Anthropic,
}

impl ModelProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "openai",
            ModelProvider::Ollama => "ollama",
            ModelProvider::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ModelProvider::OpenAi => "gpt-3.5-turbo-0125",
            ModelProvider::Ollama => "gpt-oss:120b-cloud",
            ModelProvider::Anthropic => "claude-sonnet-4-5",
        }
    }
}

impl FromStr for ModelProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ModelProvider::OpenAi),
            "ollama" | "local" => Ok(ModelProvider::Ollama),
            "anthropic" | "claude" => Ok(ModelProvider::Anthropic),
            other => bail!("unknown model provider '{other}' (expected openai, ollama or anthropic)"),
        }
    }
}

/// Deployment profile. Development echoes upstream error detail to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => bail!("unknown environment '{other}'"),
        }
    }
}

/// Settings for the model backend. Missing credentials are not a startup
/// error: the client fails on first use instead.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model_id: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelConfig,
    pub cache_ttl_secs: u64,
    pub cache_max_size: usize,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: usize,
    pub max_prompt_length: usize,
    pub fallback_enabled: bool,
    pub schema_profile: SchemaProfile,
    pub environment: Environment,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider: ModelProvider = parse_or(&lookup, "MODEL_PROVIDER", ModelProvider::OpenAi)?;
        let model_id = non_empty(&lookup, "MODEL_ID")
            .unwrap_or_else(|| provider.default_model().to_string());

        let strict: bool = parse_or(&lookup, "STRICT_SCHEMA", false)?;

        let config = Config {
            model: ModelConfig {
                provider,
                model_id,
                api_key: non_empty(&lookup, "MODEL_API_KEY"),
                base_url: non_empty(&lookup, "MODEL_BASE_URL"),
                timeout_secs: parse_or(&lookup, "MODEL_TIMEOUT_SECS", 120)?,
            },
            cache_ttl_secs: parse_or(&lookup, "CACHE_TTL_SECS", DEFAULT_TTL_SECS)?,
            cache_max_size: parse_or(&lookup, "CACHE_MAX_SIZE", DEFAULT_MAX_SIZE)?,
            rate_limit_window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", DEFAULT_WINDOW_SECS)?,
            rate_limit_max_requests: parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", DEFAULT_MAX_REQUESTS)?,
            max_prompt_length: parse_or(&lookup, "MAX_PROMPT_LENGTH", DEFAULT_MAX_PROMPT_LENGTH)?,
            fallback_enabled: parse_or(&lookup, "FALLBACK_ENABLED", false)?,
            schema_profile: if strict {
                SchemaProfile::Strict
            } else {
                SchemaProfile::Lenient
            },
            environment: parse_or(&lookup, "ENVIRONMENT", Environment::Development)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: non_empty(&lookup, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        if config.cache_max_size == 0 {
            bail!("CACHE_MAX_SIZE must be at least 1");
        }
        if config.rate_limit_window_secs == 0 || config.rate_limit_max_requests == 0 {
            bail!("RATE_LIMIT_WINDOW_SECS and RATE_LIMIT_MAX_REQUESTS must be at least 1");
        }

        Ok(config)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}
