//! Response Extractor — recovers a JSON object from free-form model output.
//!
//! Candidate selection (fence stripping, greedy brace span) is total. The
//! parse strategies run in order and the first to yield an object wins; only
//! exhausting all of them is an error.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::AppError;

/// Maximum characters of offending output carried in an extraction error.
pub const SNIPPET_LIMIT: usize = 500;

type JsonObject = Map<String, Value>;

/// A parse strategy: given the candidate and the raw model text, try to
/// produce a JSON object.
type Strategy = fn(candidate: &str, raw: &str) -> Option<JsonObject>;

/// Strategies in priority order. Append new recovery heuristics here.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("strict", strict),
    ("single_quote_repair", single_quote_repair),
    ("balanced_scan", balanced_scan),
];

fn strict(candidate: &str, _raw: &str) -> Option<JsonObject> {
    parse_object(candidate)
}

fn single_quote_repair(candidate: &str, _raw: &str) -> Option<JsonObject> {
    parse_object(&repair_single_quotes(candidate))
}

fn balanced_scan(_candidate: &str, raw: &str) -> Option<JsonObject> {
    first_balanced_object(strip_code_fences(raw)).or_else(|| first_balanced_object(raw))
}

/// Strips an opening ```` ``` ```` / ```` ```json ```` marker and its closing
/// ```` ``` ````. A fence only counts at the start of the text or of a line,
/// so backticks inside JSON string values are left alone. Text before an
/// opening fence is dropped.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(start) = opening_fence(text) {
        let after = &text[start + 3..];
        text = after
            .strip_prefix("json")
            .or_else(|| after.strip_prefix("JSON"))
            .unwrap_or(after);
        if let Some(end) = text.rfind("\n```") {
            text = &text[..end];
        }
    }

    let text = text.trim_end();
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn opening_fence(text: &str) -> Option<usize> {
    if text.starts_with("```") {
        return Some(0);
    }
    text.find("\n```").map(|newline| newline + 1)
}

/// Greedy span from the first `{` through the last `}`. Returns the whole
/// input when no such span exists.
pub fn greedy_object_span(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Produces the best-effort candidate string for parsing. Total: always
/// returns something, possibly the input itself.
pub fn extract_candidate(text: &str) -> &str {
    greedy_object_span(strip_code_fences(text))
}

/// Runs the strategy chain over raw model text.
pub fn extract_object(text: &str) -> Result<JsonObject, AppError> {
    let candidate = extract_candidate(text);

    for (name, strategy) in STRATEGIES {
        if let Some(object) = strategy(candidate, text) {
            debug!(strategy = *name, "Recovered JSON object from model output");
            return Ok(object);
        }
    }

    let snippet = truncate_chars(text, SNIPPET_LIMIT);
    warn!(
        chars = text.chars().count(),
        "No extraction strategy recovered a JSON object"
    );
    Err(AppError::UnparseableResponse { snippet })
}

fn parse_object(candidate: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Heuristic for models that emit Python-style dict literals.
fn repair_single_quotes(candidate: &str) -> String {
    candidate.replace('\'', "\"")
}

/// Scans for brace-balanced objects, honouring string literals and escapes,
/// and returns the first one that parses (strictly or after quote repair).
fn first_balanced_object(text: &str) -> Option<JsonObject> {
    let bytes = text.as_bytes();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if let Some(close) = matching_brace(bytes, open) {
            let slice = &text[open..=close];
            if let Some(object) =
                parse_object(slice).or_else(|| parse_object(&repair_single_quotes(slice)))
            {
                return Some(object);
            }
        }
        start = open + 1;
    }

    None
}

fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                in_string = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' => in_string = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
