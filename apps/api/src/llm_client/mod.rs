//! LLM client: the single point of entry for all text-generation calls.
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint. Calls are not
//! retried: a failed or timed-out call is reported to the caller as-is.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const GENERATE_PATH: &str = "/api/generate";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Anything that can turn a prompt into raw model text.
///
/// Carried in `AppState` as `Arc<dyn TextGenerator>`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// `json_output` asks the backend to constrain its answer to JSON.
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        json_output: bool,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
}

/// HTTP client for the generation service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        json_output: bool,
    ) -> Result<String, LlmError> {
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: json_output.then_some("json"),
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, GENERATE_PATH))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = serde_json::from_str(&body)?;
        let text = extract_text(&payload);

        debug!(
            "LLM call succeeded: model={}, chars={}",
            self.model,
            text.chars().count()
        );

        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

/// Pulls the generated text out of a response body.
///
/// Order: `response`, then `message.content`, then the whole payload as text.
fn extract_text(payload: &Value) -> String {
    if let Some(text) = payload.get("response").and_then(Value::as_str) {
        return text.to_string();
    }
    if let Some(message) = payload
        .get("message")
        .cloned()
        .and_then(|m| serde_json::from_value::<ChatMessage>(m).ok())
    {
        return message.content;
    }
    payload.to_string()
}
