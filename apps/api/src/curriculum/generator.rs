//! Curriculum generation for one request, end to end.
//!
//! Flow: validate input → duration policy → prompt → LLM call → parse →
//!       optional structural validation.
//!
//! Input is validated before anything touches the network; quota checks
//! happen in the handler between `validate` and `generate_curriculum`.

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{Config, ParserMode};
use crate::curriculum::duration::DurationSpec;
use crate::curriculum::json_parser::parse_curriculum_json;
use crate::curriculum::models::CurriculumOutput;
use crate::curriculum::parser::parse_curriculum;
use crate::curriculum::prompts::{build_prompt, system_prompt};
use crate::curriculum::validation::validate_curriculum;
use crate::errors::AppError;
use crate::llm_client::TextGenerator;

/// Raw model text kept in logs when parsing fails.
const LOGGED_RAW_CHARS: usize = 500;

/// Request body for `/generate` and `/download-pdf`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurriculumRequest {
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

/// A request that passed input validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub skill: String,
    pub duration: String,
    pub level: Option<String>,
}

impl CurriculumRequest {
    /// Fails fast on a missing or blank skill; fills the default duration.
    pub fn validate(self, default_duration: &str) -> Result<ValidatedRequest, AppError> {
        let skill = self
            .skill
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Validation("Please provide a skill".to_string()))?;

        let duration = self
            .duration
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| default_duration.to_string());

        Ok(ValidatedRequest {
            skill,
            duration,
            level: self.level,
        })
    }
}

/// Asks the model for a curriculum and parses the answer.
///
/// An empty parse counts as failure (`InvalidAiResponse`); the raw text is
/// logged, never returned.
pub async fn generate_curriculum(
    llm: &dyn TextGenerator,
    config: &Config,
    request: &ValidatedRequest,
) -> Result<CurriculumOutput, AppError> {
    let duration = DurationSpec::from_input(&request.duration);
    info!(
        "Generating curriculum: skill={:?} duration={:?} phases={} short_track={}",
        request.skill,
        request.duration,
        duration.phases(),
        duration.is_short_track
    );

    let mode = config.parser_mode;
    let prompt = build_prompt(&request.skill, request.level.as_deref(), &duration, mode);
    let raw_text = llm
        .generate(&prompt, &system_prompt(mode), mode == ParserMode::Json)
        .await
        .map_err(|e| AppError::Llm(format!("Curriculum generation failed: {e}")))?;

    let output = match parse_output(&raw_text, mode) {
        Some(output) => output,
        None => {
            warn!(
                "Unparseable curriculum output ({mode:?} mode): {:?}",
                raw_text.chars().take(LOGGED_RAW_CHARS).collect::<String>()
            );
            return Err(AppError::InvalidAiResponse);
        }
    };

    if config.strict_schema {
        validate_curriculum(&output).map_err(|e| AppError::Schema(e.to_string()))?;
    }

    let view = output.to_curriculum();
    info!(
        "Parsed curriculum with {} phases, {} courses",
        view.phases.len(),
        view.course_count()
    );
    Ok(output)
}

/// Runs the parser for `mode`; `None` when nothing usable came out.
fn parse_output(raw_text: &str, mode: ParserMode) -> Option<CurriculumOutput> {
    let output = match mode {
        ParserMode::Text => CurriculumOutput::Phases(parse_curriculum(raw_text)),
        ParserMode::Json => CurriculumOutput::Document(parse_curriculum_json(raw_text)?),
    };
    (!output.is_empty()).then_some(output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Canned generator that records the prompts it receives.
    pub(crate) struct StubGenerator {
        reply: Result<String, String>,
        delay: Option<Duration>,
        pub(crate) prompts: Mutex<Vec<(String, bool)>>,
    }

    impl StubGenerator {
        pub(crate) fn replying(text: &str) -> Self {
            StubGenerator {
                reply: Ok(text.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(message: &str) -> Self {
            StubGenerator {
                reply: Err(message.to_string()),
                delay: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Answers like `replying`, but only after `delay`.
        pub(crate) fn replying_after(text: &str, delay: Duration) -> Self {
            StubGenerator {
                delay: Some(delay),
                ..Self::replying(text)
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _system: &str,
            json_output: bool,
        ) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), json_output));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(LlmError::Api {
                    status: 503,
                    message: message.clone(),
                }),
            }
        }
    }

    pub(crate) const SEMESTER_TEXT: &str = "Here is your curriculum:\n\
        **Semester 1:**\n\
        - Intro to X\n\
        Description: first steps\n\
        Key topics: basics, setup\n\
        - Advanced Y\n\
        Key topics: deep dive\n";

    fn request(skill: &str, duration: &str) -> ValidatedRequest {
        CurriculumRequest {
            skill: Some(skill.to_string()),
            duration: Some(duration.to_string()),
            level: None,
        }
        .validate("1 year")
        .unwrap()
    }

    #[test]
    fn test_validate_rejects_missing_or_blank_skill() {
        let missing = CurriculumRequest::default().validate("1 year");
        assert!(matches!(missing, Err(AppError::Validation(_))));

        let blank = CurriculumRequest {
            skill: Some("   ".into()),
            ..Default::default()
        }
        .validate("1 year");
        assert!(matches!(blank, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_applies_default_duration() {
        let validated = CurriculumRequest {
            skill: Some(" Rust ".into()),
            duration: Some(" ".into()),
            level: None,
        }
        .validate("6 Months")
        .unwrap();
        assert_eq!(validated.skill, "Rust");
        assert_eq!(validated.duration, "6 Months");
    }

    #[tokio::test]
    async fn test_text_mode_generates_phase_map() {
        let llm = StubGenerator::replying(SEMESTER_TEXT);
        let config = Config::for_tests();

        let output = generate_curriculum(&llm, &config, &request("X", "3 months"))
            .await
            .unwrap();

        let curriculum = output.to_curriculum();
        assert_eq!(curriculum.phases[0].label, "Semester 1");
        assert_eq!(curriculum.course_count(), 2);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].0.contains("single-phase"));
        assert!(!prompts[0].1, "text mode must not request JSON output");
    }

    #[tokio::test]
    async fn test_json_mode_generates_document() {
        let llm = StubGenerator::replying(
            "```json\n[{\"phase\": \"Phase 1\", \"courses\": [{\"course_title\": \"Intro\"}]}]\n```",
        );
        let config = Config {
            parser_mode: ParserMode::Json,
            ..Config::for_tests()
        };

        let output = generate_curriculum(&llm, &config, &request("X", "6 months"))
            .await
            .unwrap();

        match &output {
            CurriculumOutput::Document(doc) => {
                assert_eq!(doc["curriculum"][0]["courses"][0]["course_title"], "Intro");
            }
            other => panic!("expected document, got {other:?}"),
        }
        assert!(llm.prompts.lock().unwrap()[0].1);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_invalid_ai_response() {
        let llm = StubGenerator::replying("I cannot help with that.");
        let result = generate_curriculum(&llm, &Config::for_tests(), &request("X", "1 year")).await;
        assert!(matches!(result, Err(AppError::InvalidAiResponse)));
    }

    #[tokio::test]
    async fn test_json_mode_has_no_text_fallback() {
        let llm = StubGenerator::replying(SEMESTER_TEXT);
        let config = Config {
            parser_mode: ParserMode::Json,
            ..Config::for_tests()
        };
        let result = generate_curriculum(&llm, &config, &request("X", "1 year")).await;
        assert!(matches!(result, Err(AppError::InvalidAiResponse)));
    }

    #[tokio::test]
    async fn test_llm_failure_maps_to_llm_error() {
        let llm = StubGenerator::failing("model offline");
        let result = generate_curriculum(&llm, &Config::for_tests(), &request("X", "1 year")).await;
        assert!(matches!(result, Err(AppError::Llm(_))));
    }

    #[tokio::test]
    async fn test_strict_schema_rejects_empty_phase() {
        let llm = StubGenerator::replying("Semester 1\nIntro\nSemester 2\n");
        let lenient = generate_curriculum(&llm, &Config::for_tests(), &request("X", "1 year")).await;
        assert!(lenient.is_ok());

        let config = Config {
            strict_schema: true,
            ..Config::for_tests()
        };
        let strict = generate_curriculum(&llm, &config, &request("X", "1 year")).await;
        assert!(matches!(strict, Err(AppError::Schema(_))));
    }
}
