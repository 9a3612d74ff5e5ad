// Roadmap generation core.
// sanitize → rate limit → cache → model → extract → normalize → cache store.
// All model calls go through llm_client — no direct provider calls here.

pub mod cache;
pub mod extractor;
pub mod fallback;
pub mod normalizer;
pub mod orchestrator;
pub mod rate_limiter;
pub mod sanitizer;
