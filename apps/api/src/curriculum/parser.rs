//! Line-oriented curriculum parser.
//!
//! Reads loosely formatted model output in a single forward pass:
//!
//! ```text
//! **Semester 1:**
//! - Intro to X
//!   Description: What X is
//!   Key topics: basics, setup (tooling)
//! ```
//!
//! Each line is classified on its own, then fed to a three-state machine:
//! `NoPhase` → `InPhase` → `InCourse`. Malformed input never fails; the worst
//! case is an empty `Curriculum`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::curriculum::models::{Course, Curriculum, Phase};

/// Line prefixes the model uses for chatter rather than content.
const FILLER_PREFIXES: &[&str] = &["note", "here is", "this is", "sure", "rule", "format"];

const DESCRIPTION_PREFIX: &str = "description:";
const KEY_TOPICS_PREFIX: &str = "key topics";

fn bullet_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[•*+\-\s]+").expect("bullet regex is valid"))
}

fn topic_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,()]").expect("topic regex is valid"))
}

/// What a single line means, independent of parser state.
#[derive(Debug, PartialEq, Eq)]
enum LineKind<'a> {
    PhaseHeading(&'a str),
    Description(&'a str),
    KeyTopics(&'a str),
    Filler,
    CourseTitle(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// No heading seen yet; course lines have nowhere to go.
    NoPhase,
    InPhase { phase: usize },
    /// Description and topics lines attach to `course`.
    InCourse { phase: usize, course: usize },
}

impl ParserState {
    fn phase(self) -> Option<usize> {
        match self {
            ParserState::NoPhase => None,
            ParserState::InPhase { phase } | ParserState::InCourse { phase, .. } => Some(phase),
        }
    }
}

/// Parses raw model text into a phase → courses mapping.
pub fn parse_curriculum(text: &str) -> Curriculum {
    let mut parser = LineParser::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        parser.feed(line);
    }
    parser.curriculum
}

struct LineParser {
    curriculum: Curriculum,
    state: ParserState,
    /// Lower-cased titles seen anywhere in this run.
    seen_titles: HashSet<String>,
}

impl Default for LineParser {
    fn default() -> Self {
        LineParser {
            curriculum: Curriculum::default(),
            state: ParserState::NoPhase,
            seen_titles: HashSet::new(),
        }
    }
}

impl LineParser {
    fn feed(&mut self, line: &str) {
        let line = line.replace("**", "");
        match classify(&line) {
            LineKind::PhaseHeading(label) => self.on_phase_heading(label),
            LineKind::Description(text) => self.on_description(text),
            LineKind::KeyTopics(text) => self.on_key_topics(text),
            LineKind::Filler => {}
            LineKind::CourseTitle(title) => self.on_course_title(title),
        }
    }

    fn on_phase_heading(&mut self, label: &str) {
        let phases = &mut self.curriculum.phases;
        let phase = match phases.iter().position(|p| p.label == label) {
            // A repeated heading re-opens the phase with a fresh course list.
            Some(index) => {
                phases[index].courses.clear();
                index
            }
            None => {
                phases.push(Phase {
                    label: label.to_string(),
                    ..Default::default()
                });
                phases.len() - 1
            }
        };
        self.state = ParserState::InPhase { phase };
    }

    fn on_description(&mut self, text: &str) {
        if let Some(course) = self.current_course_mut() {
            course.course_description = text.to_string();
        }
    }

    fn on_key_topics(&mut self, text: &str) {
        if let Some(course) = self.current_course_mut() {
            course.topics = split_topics(text);
        }
    }

    fn on_course_title(&mut self, line: &str) {
        let Some(phase) = self.state.phase() else {
            return;
        };

        let title = line.strip_suffix('.').unwrap_or(line).trim();
        if title.is_empty() {
            return;
        }

        if !self.seen_titles.insert(title.to_lowercase()) {
            // Dropped duplicates must not receive the lines that follow them.
            self.state = ParserState::InPhase { phase };
            return;
        }

        let courses = &mut self.curriculum.phases[phase].courses;
        courses.push(Course::titled(title));
        self.state = ParserState::InCourse {
            phase,
            course: courses.len() - 1,
        };
    }

    fn current_course_mut(&mut self) -> Option<&mut Course> {
        match self.state {
            ParserState::InCourse { phase, course } => {
                self.curriculum.phases.get_mut(phase)?.courses.get_mut(course)
            }
            _ => None,
        }
    }
}

fn classify(line: &str) -> LineKind<'_> {
    if line.contains("Phase") || line.contains("Semester") {
        return LineKind::PhaseHeading(line.trim().trim_end_matches(':').trim_end());
    }

    let clean = bullet_prefix().find(line).map_or(line, |m| &line[m.end()..]);

    if starts_with_ignore_case(clean, DESCRIPTION_PREFIX) {
        return LineKind::Description(after_first_colon(clean).unwrap_or_default());
    }

    if starts_with_ignore_case(clean, KEY_TOPICS_PREFIX) {
        let text = after_first_colon(clean)
            .unwrap_or_else(|| clean.get(KEY_TOPICS_PREFIX.len()..).unwrap_or_default());
        return LineKind::KeyTopics(text);
    }

    if FILLER_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(clean, prefix))
    {
        return LineKind::Filler;
    }

    LineKind::CourseTitle(clean)
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn after_first_colon(s: &str) -> Option<&str> {
    s.split_once(':').map(|(_, rest)| rest.trim())
}

fn split_topics(text: &str) -> Vec<String> {
    topic_separator()
        .split(text)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
