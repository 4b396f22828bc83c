// Prompt constants for curriculum generation.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::config::ParserMode;
use crate::curriculum::duration::DurationSpec;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, PLAIN_FORMAT_SYSTEM};

const DEFAULT_LEVEL: &str = "beginner";

const ROLE_SYSTEM: &str = "You are an experienced curriculum designer who builds \
    practical, well-sequenced learning plans.";

/// Scope line for the half-length track.
const SHORT_TRACK_SCOPE: &str = "Create a SHORT, single-phase curriculum for {skill} at {level} level.
Rules:
- Provide exactly 1 phase.
- Include ONLY 2 to 3 courses.
- Focus on fundamentals.
- Each course must include a one-line description and key topics.";

/// Scope line for multi-phase tracks.
const FULL_TRACK_SCOPE: &str = "Create a {phase_count}-phase curriculum for {skill} at {level} level.
Rules:
- Provide exactly {phase_count} phase(s), in learning order.
- Each phase must include 3 to 5 courses.
- Never repeat a course title.
- Each course must include a one-line description and key topics.";

/// Line format the text parser reads back.
const TEXT_FORMAT: &str = "Format EXACTLY like this, with no other text:
Phase 1: Phase Name
Course Name
Description: one sentence
Key topics: topic1, topic2, topic3";

/// Document shape the JSON parser reads back.
const JSON_FORMAT: &str = r#"Return a JSON object with this EXACT schema:
{
  "curriculum": [
    {
      "phase": "Phase 1: Phase Name",
      "phase_objective": "What the learner can do after this phase",
      "courses": [
        {
          "course_title": "Course Name",
          "course_description": "One sentence",
          "topics": ["topic1", "topic2"]
        }
      ]
    }
  ]
}"#;

/// Builds the user prompt for one generation request.
pub fn build_prompt(
    skill: &str,
    level: Option<&str>,
    duration: &DurationSpec,
    mode: ParserMode,
) -> String {
    let level = level
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LEVEL);

    let scope = if duration.is_short_track {
        SHORT_TRACK_SCOPE
    } else {
        FULL_TRACK_SCOPE
    };
    let format = match mode {
        ParserMode::Text => TEXT_FORMAT,
        ParserMode::Json => JSON_FORMAT,
    };

    fill_placeholders(
        &format!("{scope}\n\n{format}"),
        &[
            ("skill", skill.trim()),
            ("level", level),
            ("phase_count", duration.phase_count),
        ],
    )
}

/// Substitutes `{key}` placeholders in one pass over the template.
///
/// Inserted values are never scanned again, so user text containing
/// `{level}` stays literal. Braces that name no key are kept.
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut filled = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        filled.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let hit = values.iter().find_map(|(key, value)| {
            after
                .strip_prefix(key)
                .and_then(|tail| tail.strip_prefix('}'))
                .map(|tail| (*value, tail))
        });
        match hit {
            Some((value, tail)) => {
                filled.push_str(value);
                rest = tail;
            }
            None => {
                filled.push('{');
                rest = after;
            }
        }
    }
    filled.push_str(rest);
    filled
}

/// System prompt matching the requested output format.
pub fn system_prompt(mode: ParserMode) -> String {
    let format_rule = match mode {
        ParserMode::Text => PLAIN_FORMAT_SYSTEM,
        ParserMode::Json => JSON_ONLY_SYSTEM,
    };
    format!("{ROLE_SYSTEM} {format_rule}")
}
