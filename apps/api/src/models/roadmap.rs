use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resource types the prompt asks the model for. Advisory only: unknown
/// types are kept as-is.
pub const KNOWN_RESOURCE_TYPES: &[&str] = &["article", "course", "youtube", "book"];

/// A single learning resource attached to a roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// The canonical, normalized career roadmap returned to callers and cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapDocument {
    pub title: String,
    pub explanation: String,
    pub average_salary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_openings: Option<String>,
    pub youtube_video_recommendation: String,
    #[serde(default)]
    pub learning_resources: Vec<LearningResource>,
}

/// Response body of the generate endpoint: the document fields flattened,
/// plus delivery metadata.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedRoadmap {
    #[serde(flatten)]
    pub document: RoadmapDocument,
    pub cached: bool,
    /// True when the live model was unreachable and a placeholder was served.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_time_ms: Option<u64>,
    pub generated_at: DateTime<Utc>,
}
