//! Structural checks applied after parsing when `STRICT_SCHEMA` is on.
//!
//! The parsers are permissive by contract; this is where required shape is
//! enforced. Messages name the offending path, e.g. `curriculum[1].courses[0]`.

use serde_json::Value;
use thiserror::Error;

use crate::curriculum::models::{Curriculum, CurriculumOutput};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct SchemaViolation {
    pub path: String,
    pub reason: String,
}

impl SchemaViolation {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub fn validate_curriculum(output: &CurriculumOutput) -> Result<(), SchemaViolation> {
    match output {
        CurriculumOutput::Phases(curriculum) => validate_phases(curriculum),
        CurriculumOutput::Document(doc) => validate_document(doc),
    }
}

fn validate_phases(curriculum: &Curriculum) -> Result<(), SchemaViolation> {
    for phase in &curriculum.phases {
        if phase.courses.is_empty() {
            return Err(SchemaViolation::new(
                phase.label.as_str(),
                "phase has no courses",
            ));
        }
        for (i, course) in phase.courses.iter().enumerate() {
            if course.course_title.trim().is_empty() {
                return Err(SchemaViolation::new(
                    format!("{}[{i}]", phase.label),
                    "course_title is empty",
                ));
            }
        }
    }
    Ok(())
}

fn validate_document(doc: &Value) -> Result<(), SchemaViolation> {
    let phases = doc
        .get("curriculum")
        .and_then(Value::as_array)
        .ok_or_else(|| SchemaViolation::new("curriculum", "must be an array"))?;

    for (p, phase) in phases.iter().enumerate() {
        let path = format!("curriculum[{p}]");
        if !phase.is_object() {
            return Err(SchemaViolation::new(path, "phase must be an object"));
        }
        let courses = phase
            .get("courses")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaViolation::new(format!("{path}.courses"), "must be an array"))?;
        if courses.is_empty() {
            return Err(SchemaViolation::new(format!("{path}.courses"), "phase has no courses"));
        }

        for (c, course) in courses.iter().enumerate() {
            let course_path = format!("{path}.courses[{c}]");
            let title = course.get("course_title").and_then(Value::as_str);
            if title.map_or(true, |t| t.trim().is_empty()) {
                return Err(SchemaViolation::new(
                    format!("{course_path}.course_title"),
                    "required non-empty string",
                ));
            }
            if let Some(topics) = course.get("topics") {
                let all_strings = topics
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string));
                if !all_strings {
                    return Err(SchemaViolation::new(
                        format!("{course_path}.topics"),
                        "must be an array of strings",
                    ));
                }
            }
        }
    }
    Ok(())
}
