//! JSON-first curriculum parser, used when the model is asked for JSON.
//!
//! There is no fallback to the line parser: if no bracketed span
//! deserializes, the parse fails.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

fn object_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("object span regex is valid"))
}

fn array_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("array span regex is valid"))
}

/// Parses model output into `{"curriculum": [...]}`, or `None`.
///
/// Fence markers are removed wherever they appear. The object span runs from
/// the first `{` to the last `}`. When a `[` opens before any `{`, the `[ … ]`
/// span is tried first so a bare array can be read; if it does not
/// deserialize, the object span is tried next.
///
/// Normalization: a document that already has a `curriculum` key is returned
/// as-is, a bare array becomes `{"curriculum": array}`, and any other object
/// becomes `{"curriculum": [object]}`.
pub fn parse_curriculum_json(text: &str) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    let parsed = candidate_spans(&cleaned)
        .into_iter()
        .find_map(|span| match serde_json::from_str::<Value>(span) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Curriculum JSON span did not deserialize: {e}");
                None
            }
        })?;

    Some(normalize(parsed))
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "")
}

/// Spans worth trying, in order.
fn candidate_spans(text: &str) -> Vec<&str> {
    let object = object_span().find(text);
    let array = array_span().find(text);
    match (object, array) {
        (Some(o), Some(a)) if a.start() < o.start() => vec![a.as_str(), o.as_str()],
        (Some(o), _) => vec![o.as_str()],
        (None, Some(a)) => vec![a.as_str()],
        (None, None) => Vec::new(),
    }
}

fn normalize(parsed: Value) -> Value {
    if parsed.get("curriculum").is_some() {
        return parsed;
    }
    match parsed {
        Value::Array(_) => json!({ "curriculum": parsed }),
        other => json!({ "curriculum": [other] }),
    }
}
