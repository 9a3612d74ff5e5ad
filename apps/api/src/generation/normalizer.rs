//! Schema Normalizer — canonicalizes model-chosen key spellings and validates
//! the roadmap shape.
//!
//! Models return `"Average Salary"`, `"averageSalary"`, `"average-salary"` and
//! so on for the same field. Every key is folded to snake_case first, then a
//! small alias table maps the remaining known variants.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::roadmap::{LearningResource, RoadmapDocument, KNOWN_RESOURCE_TYPES};

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://\S+$").expect("url pattern is a valid regex"));

/// Which fields must be present and non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaProfile {
    #[default]
    Lenient,
    /// Also requires `job_openings`.
    Strict,
}

impl SchemaProfile {
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            SchemaProfile::Lenient => &[
                "title",
                "explanation",
                "average_salary",
                "youtube_video_recommendation",
            ],
            SchemaProfile::Strict => &[
                "title",
                "explanation",
                "average_salary",
                "job_openings",
                "youtube_video_recommendation",
            ],
        }
    }
}

/// Post-canonicalization aliases: (variant, canonical).
const KEY_ALIASES: &[(&str, &str)] = &[
    ("you_tube_video_recommendation", "youtube_video_recommendation"),
    ("you_tube_recommendation", "youtube_video_recommendation"),
    ("youtube_recommendation", "youtube_video_recommendation"),
    ("you_tube_video", "youtube_video_recommendation"),
    ("youtube_video", "youtube_video_recommendation"),
    ("resources", "learning_resources"),
    ("you_tube", "youtube"),
    ("link", "url"),
    ("name", "title"),
    ("resource_type", "type"),
    ("kind", "type"),
];

/// Folds a key to snake_case: splits camelCase boundaries, collapses every
/// run of non-alphanumerics into one `_`, lowercases, trims separators.
pub fn canonical_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev: Option<char> = None;
    let mut pending_separator = false;

    for c in key.chars() {
        if !c.is_alphanumeric() {
            pending_separator = true;
            prev = Some(c);
            continue;
        }

        let camel_boundary =
            c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
        if (pending_separator || camel_boundary) && !out.is_empty() {
            out.push('_');
        }
        pending_separator = false;
        out.extend(c.to_lowercase());
        prev = Some(c);
    }

    out
}

fn resolve_alias(key: String) -> String {
    KEY_ALIASES
        .iter()
        .find(|(variant, _)| *variant == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}

/// Canonicalizes every key of an object. When two spellings collide, the
/// first non-empty value wins.
pub fn canonicalize_keys(object: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(object.len());
    for (key, value) in object {
        let key = resolve_alias(canonical_key(&key));
        let replace = match out.get(&key) {
            None => true,
            Some(existing) => is_blank(existing) && !is_blank(&value),
        };
        if replace {
            out.insert(key, value);
        }
    }
    out
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Reads a scalar as text. Strings are trimmed; numbers and booleans are
/// stringified; empty strings and structured values count as absent.
fn text_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Normalizes an extracted object into a `RoadmapDocument`, failing with
/// `IncompleteDocument` naming every missing required key.
pub fn normalize(object: Map<String, Value>, profile: SchemaProfile) -> Result<RoadmapDocument, AppError> {
    let mut object = canonicalize_keys(object);

    let missing: Vec<String> = profile
        .required_fields()
        .iter()
        .filter(|field| text_field(object.get(**field)).is_none())
        .map(|field| field.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AppError::IncompleteDocument(missing));
    }

    let resources = match object.remove("learning_resources") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single) => vec![single],
    };

    let learning_resources = resources
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| normalize_resource(index, item))
        .collect();

    let take = |key: &str| text_field(object.get(key)).unwrap_or_default();

    let ignored: Vec<&String> = object
        .keys()
        .filter(|k| {
            !matches!(
                k.as_str(),
                "title" | "explanation" | "average_salary" | "job_openings" | "youtube_video_recommendation"
            )
        })
        .collect();
    if !ignored.is_empty() {
        debug!(keys = ?ignored, "Dropping unrecognized roadmap keys");
    }

    Ok(RoadmapDocument {
        title: take("title"),
        explanation: take("explanation"),
        average_salary: take("average_salary"),
        job_openings: text_field(object.get("job_openings")),
        youtube_video_recommendation: take("youtube_video_recommendation"),
        learning_resources,
    })
}

fn normalize_resource(index: usize, item: Value) -> Option<LearningResource> {
    let resource = match item {
        Value::Object(map) => {
            let map = canonicalize_keys(map);
            let url = text_field(map.get("url")).unwrap_or_default();
            let title = text_field(map.get("title")).unwrap_or_else(|| url.clone());
            let resource_type = text_field(map.get("type"))
                .map(|t| t.to_lowercase())
                .unwrap_or_else(|| infer_resource_type(&url).to_string());
            LearningResource {
                title,
                url,
                resource_type,
            }
        }
        Value::String(s) => {
            let s = s.trim().to_string();
            let url = if HTTP_URL.is_match(&s) { s.clone() } else { String::new() };
            LearningResource {
                resource_type: infer_resource_type(&url).to_string(),
                title: s,
                url,
            }
        }
        other => {
            warn!(index, kind = %json_kind(&other), "Skipping learning resource that is not an object");
            return None;
        }
    };

    if !HTTP_URL.is_match(&resource.url) {
        warn!(index, title = %resource.title, "Learning resource url is not an http(s) link");
    }
    if !KNOWN_RESOURCE_TYPES.contains(&resource.resource_type.as_str()) {
        debug!(index, resource_type = %resource.resource_type, "Unrecognized learning resource type");
    }

    Some(resource)
}

fn infer_resource_type(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        "youtube"
    } else {
        "article"
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn complete() -> Value {
        json!({
            "title": "Frontend Engineer",
            "explanation": "Builds the user-facing web.",
            "average_salary": "$70k",
            "job_openings": "High",
            "youtube_video_recommendation": "https://youtube.com/watch?v=abc",
            "learning_resources": [
                {"title": "MDN", "url": "https://developer.mozilla.org", "type": "article"}
            ]
        })
    }

    #[test]
    fn test_canonical_key_variants() {
        assert_eq!(canonical_key("Average Salary"), "average_salary");
        assert_eq!(canonical_key("averageSalary"), "average_salary");
        assert_eq!(canonical_key("  average--salary  "), "average_salary");
        assert_eq!(canonical_key("Job openings"), "job_openings");
        assert_eq!(canonical_key("learning_resources"), "learning_resources");
        assert_eq!(canonical_key("top10Skills"), "top10_skills");
        assert_eq!(canonical_key("level2Title"), "level2_title");
        assert_eq!(canonical_key("__title__"), "title");
    }

    #[test]
    fn test_spaced_title_case_keys_are_canonicalized() {
        let map = canonicalize_keys(object(json!({
            "Average Salary": "$50k",
            "YouTube Video Recommendation": "url"
        })));
        assert_eq!(map["average_salary"], "$50k");
        assert_eq!(map["youtube_video_recommendation"], "url");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_complete_document_normalizes() {
        let doc = normalize(object(complete()), SchemaProfile::Lenient).unwrap();
        assert_eq!(doc.title, "Frontend Engineer");
        assert_eq!(doc.job_openings.as_deref(), Some("High"));
        assert_eq!(doc.learning_resources.len(), 1);
        assert_eq!(doc.learning_resources[0].resource_type, "article");
    }

    #[test]
    fn test_missing_explanation_is_named() {
        let mut value = complete();
        value.as_object_mut().unwrap().remove("explanation");
        match normalize(object(value), SchemaProfile::Lenient) {
            Err(AppError::IncompleteDocument(missing)) => assert_eq!(missing, vec!["explanation"]),
            other => panic!("expected IncompleteDocument, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_required_field_counts_as_missing() {
        let mut value = complete();
        value["title"] = json!("   ");
        value["average_salary"] = json!(null);
        match normalize(object(value), SchemaProfile::Lenient) {
            Err(AppError::IncompleteDocument(missing)) => {
                assert_eq!(missing, vec!["title", "average_salary"])
            }
            other => panic!("expected IncompleteDocument, got {other:?}"),
        }
    }

    #[test]
    fn test_strict_profile_requires_job_openings() {
        let mut value = complete();
        value.as_object_mut().unwrap().remove("job_openings");
        assert!(normalize(object(value.clone()), SchemaProfile::Lenient).is_ok());
        match normalize(object(value), SchemaProfile::Strict) {
            Err(AppError::IncompleteDocument(missing)) => assert_eq!(missing, vec!["job_openings"]),
            other => panic!("expected IncompleteDocument, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_salary_is_stringified() {
        let mut value = complete();
        value["average_salary"] = json!(85000);
        let doc = normalize(object(value), SchemaProfile::Lenient).unwrap();
        assert_eq!(doc.average_salary, "85000");
    }

    #[test]
    fn test_single_resource_is_wrapped() {
        let mut value = complete();
        value["learning_resources"] = json!({"Title": "Rust Book", "URL": "https://doc.rust-lang.org/book/", "Type": "Book"});
        let doc = normalize(object(value), SchemaProfile::Lenient).unwrap();
        assert_eq!(doc.learning_resources.len(), 1);
        assert_eq!(doc.learning_resources[0].title, "Rust Book");
        assert_eq!(doc.learning_resources[0].resource_type, "book");
    }

    #[test]
    fn test_absent_resources_default_to_empty() {
        let mut value = complete();
        value.as_object_mut().unwrap().remove("learning_resources");
        let doc = normalize(object(value), SchemaProfile::Lenient).unwrap();
        assert!(doc.learning_resources.is_empty());
    }

    #[test]
    fn test_non_http_url_is_kept() {
        let mut value = complete();
        value["learning_resources"] = json!([{"title": "Local notes", "url": "notes.txt", "type": "article"}]);
        let doc = normalize(object(value), SchemaProfile::Lenient).unwrap();
        assert_eq!(doc.learning_resources[0].url, "notes.txt");
    }

    #[test]
    fn test_resource_type_is_inferred_from_url() {
        let mut value = complete();
        value["learning_resources"] = json!([
            {"title": "Crash course", "link": "https://www.youtube.com/watch?v=1"},
            "https://web.dev/learn",
            42
        ]);
        let doc = normalize(object(value), SchemaProfile::Lenient).unwrap();
        assert_eq!(doc.learning_resources.len(), 2);
        assert_eq!(doc.learning_resources[0].resource_type, "youtube");
        assert_eq!(doc.learning_resources[0].url, "https://www.youtube.com/watch?v=1");
        assert_eq!(doc.learning_resources[1].url, "https://web.dev/learn");
        assert_eq!(doc.learning_resources[1].resource_type, "article");
    }

    #[test]
    fn test_colliding_spellings_keep_first_non_empty() {
        let map = canonicalize_keys(object(json!({
            "averageSalary": "",
            "Average Salary": "$90k"
        })));
        assert_eq!(map["average_salary"], "$90k");
    }
}
