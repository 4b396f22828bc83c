use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A single course inside a phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub course_description: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Course {
    pub fn titled(title: impl Into<String>) -> Self {
        Course {
            course_title: title.into(),
            ..Default::default()
        }
    }
}

/// A phase (or semester) and the courses attached to it, in encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phase {
    pub label: String,
    /// Only set by JSON-mode output.
    pub objective: Option<String>,
    pub courses: Vec<Course>,
}

/// Ordered mapping of phase label → courses.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curriculum {
    pub phases: Vec<Phase>,
}

impl Curriculum {
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn course_count(&self) -> usize {
        self.phases.iter().map(|p| p.courses.len()).sum()
    }

    #[cfg(test)]
    pub fn phase(&self, label: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.label == label)
    }

    /// Reads either stored shape leniently: a phase map
    /// (`{"Semester 1": [...]}`) or a phase list (`{"curriculum": [...]}`).
    ///
    /// Unknown fields are ignored and missing ones left empty, so anything
    /// persisted by either parser mode can be rendered.
    pub fn from_value(value: &Value) -> Self {
        let phases = match value.get("curriculum") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| phase_from_object(i, item))
                .collect(),
            Some(_) => Vec::new(),
            None => match value.as_object() {
                Some(map) => map
                    .iter()
                    .map(|(label, courses)| Phase {
                        label: label.clone(),
                        objective: None,
                        courses: courses_from_value(courses),
                    })
                    .collect(),
                None => Vec::new(),
            },
        };
        Curriculum { phases }
    }
}

impl Serialize for Curriculum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.phases.len()))?;
        for phase in &self.phases {
            map.serialize_entry(&phase.label, &phase.courses)?;
        }
        map.end()
    }
}

const PHASE_LABEL_KEYS: &[&str] = &["phase", "phase_title", "phase_name", "semester", "title", "name"];
const COURSE_TITLE_KEYS: &[&str] = &["course_title", "title", "name", "course"];
const COURSE_DESCRIPTION_KEYS: &[&str] = &["course_description", "description"];

fn phase_from_object(index: usize, item: &Value) -> Phase {
    let label = first_str(item, PHASE_LABEL_KEYS)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Phase {}", index + 1));
    let objective = first_str(item, &["phase_objective", "objective"]).map(str::to_string);
    let courses = item
        .get("courses")
        .map(courses_from_value)
        .unwrap_or_default();
    Phase {
        label,
        objective,
        courses,
    }
}

fn courses_from_value(value: &Value) -> Vec<Course> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(title) => Some(Course::titled(title.clone())),
            Value::Object(_) => first_str(item, COURSE_TITLE_KEYS).map(|title| Course {
                course_title: title.to_string(),
                course_description: first_str(item, COURSE_DESCRIPTION_KEYS)
                    .unwrap_or_default()
                    .to_string(),
                topics: item
                    .get("topics")
                    .and_then(Value::as_array)
                    .map(|topics| {
                        topics
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            _ => None,
        })
        .collect()
}

fn first_str<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
}

/// What a parse run hands to the rest of the service.
///
/// Line mode yields the phase map; JSON mode keeps the model's document
/// (already normalized to `{"curriculum": [...]}`) untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CurriculumOutput {
    Phases(Curriculum),
    Document(Value),
}

impl CurriculumOutput {
    /// True when nothing usable came out of the parse.
    pub fn is_empty(&self) -> bool {
        match self {
            CurriculumOutput::Phases(curriculum) => curriculum.is_empty(),
            CurriculumOutput::Document(doc) => doc
                .get("curriculum")
                .and_then(Value::as_array)
                .map_or(true, Vec::is_empty),
        }
    }

    /// Renderer view of either shape.
    pub fn to_curriculum(&self) -> Curriculum {
        match self {
            CurriculumOutput::Phases(curriculum) => curriculum.clone(),
            CurriculumOutput::Document(doc) => Curriculum::from_value(doc),
        }
    }
}
