//! Degraded-mode placeholder served when the model backend is unreachable and
//! `FALLBACK_ENABLED` is set. The document is deterministic for a given
//! career label and is always flagged `degraded` in the response.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::roadmap::{LearningResource, RoadmapDocument};

pub const DEFAULT_CAREER_LABEL: &str = "Technology Professional";

static CAREER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:career|job|role|position)\b[\s:'"]*(?:(?:as|of|in|for)\s+)?(?:(?:an?|the)\s+)?['"]?([A-Za-z][A-Za-z0-9+#.]*(?:[ \-/][A-Za-z][A-Za-z0-9+#.]*){0,4})"#,
    )
    .expect("career label pattern is a valid regex")
});

/// Words that start a question or a generic noun rather than a career name.
const NON_LABEL_WORDS: &[&str] = &[
    "should", "would", "could", "can", "do", "does", "is", "are", "will", "i", "path", "paths",
    "roadmap", "advice", "change", "that", "which", "what",
];

/// Best-guess career label: the word run after "career", "job", "role" or
/// "position". Falls back to a generic label.
pub fn career_label(prompt: &str) -> String {
    CAREER_LABEL
        .captures(prompt)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('.').trim().to_string())
        .filter(|label| !label.is_empty() && !starts_with_non_label_word(label))
        .unwrap_or_else(|| DEFAULT_CAREER_LABEL.to_string())
}

fn starts_with_non_label_word(label: &str) -> bool {
    label
        .split_whitespace()
        .next()
        .map(|word| NON_LABEL_WORDS.contains(&word.to_ascii_lowercase().as_str()))
        .unwrap_or(true)
}

/// Canned roadmap for `label`. Fabricated content: callers must surface it
/// as degraded.
pub fn placeholder_document(label: &str) -> RoadmapDocument {
    let query = label.replace(' ', "+");
    RoadmapDocument {
        title: format!("{label} (sample roadmap)"),
        explanation: format!(
            "The AI generator is temporarily unavailable, so this is a generic starting roadmap for \
             becoming a {label}. Learn the core fundamentals, build small projects, publish a portfolio, \
             and apply for junior roles while continuing to deepen one specialty."
        ),
        average_salary: "Unavailable while the AI generator is offline".to_string(),
        job_openings: Some("Unavailable while the AI generator is offline".to_string()),
        youtube_video_recommendation: format!(
            "https://www.youtube.com/results?search_query={query}+roadmap"
        ),
        learning_resources: vec![
            LearningResource {
                title: format!("{label} roadmap search"),
                url: format!("https://www.google.com/search?q={query}+learning+roadmap"),
                resource_type: "article".to_string(),
            },
            LearningResource {
                title: format!("{label} courses"),
                url: format!("https://www.coursera.org/search?query={query}"),
                resource_type: "course".to_string(),
            },
        ],
    }
}
