//! Prompt Sanitizer — cleans and bounds untrusted input before it reaches the model.
//!
//! Injection detection is a logging heuristic only. It never blocks a request.

use once_cell::sync::Lazy;
use regex::RegexSet;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::AppError;

pub const DEFAULT_MAX_PROMPT_LENGTH: usize = 2000;

static INJECTION_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\b(ignore|disregard|forget)\b.{0,40}\b(previous|prior|above|earlier|all)\b.{0,20}\b(instructions?|prompts?|rules?|directions?)\b",
        r"(?i)\byou\s+are\s+now\b",
        r"(?i)\bact\s+as\s+(an?\s+)?(unrestricted|jailbroken|different)\b",
        r"(?i)\b(reveal|print|show|repeat)\b.{0,30}\b(system\s+prompt|instructions)\b",
        r"(?i)\bnew\s+instructions?\s*:",
        r"(?i)\b(jailbreak|DAN\s+mode|developer\s+mode)\b",
        r"(?i)^\s*(system|assistant)\s*:",
    ])
    .expect("injection patterns are valid regexes")
});

/// Short, stable fingerprint of a prompt. Logged in place of prompt content.
pub fn prompt_hash(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    hex::encode(&digest[..6])
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}

/// Validates and cleans raw user input.
#[derive(Debug, Clone)]
pub struct PromptSanitizer {
    max_length: usize,
}

impl Default for PromptSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROMPT_LENGTH)
    }
}

impl PromptSanitizer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Strips control characters (newline, tab and carriage return survive),
    /// trims, and enforces the length bound in characters.
    pub fn sanitize(&self, raw: &str) -> Result<String, AppError> {
        let cleaned: String = raw.chars().filter(|c| !is_stripped_control(*c)).collect();
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            return Err(AppError::InvalidPrompt("prompt cannot be empty".to_string()));
        }

        let length = cleaned.chars().count();
        if length > self.max_length {
            return Err(AppError::InvalidPrompt(format!(
                "prompt is {length} characters; the maximum is {}",
                self.max_length
            )));
        }

        let matched: Vec<usize> = INJECTION_PATTERNS.matches(cleaned).into_iter().collect();
        if !matched.is_empty() {
            warn!(
                prompt_hash = %prompt_hash(cleaned),
                patterns = ?matched,
                "Prompt matches known injection phrasing; continuing"
            );
        }

        Ok(cleaned.to_string())
    }

    /// True when the prompt looks like an instruction-override attempt.
    pub fn looks_like_injection(prompt: &str) -> bool {
        INJECTION_PATTERNS.is_match(prompt)
    }
}
