use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// How the LLM is asked to format its answer, and which parser reads it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserMode {
    /// Loose "Phase N / course / Key topics:" lines, read by the line classifier.
    Text,
    /// A JSON document, read by the brace-span parser.
    Json,
}

impl FromStr for ParserMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ParserMode::Text),
            "json" => Ok(ParserMode::Json),
            other => bail!("PARSER_MODE must be 'text' or 'json', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to handlers through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub parser_mode: ParserMode,
    /// Reject structurally incomplete curricula instead of passing them through.
    pub strict_schema: bool,
    pub default_duration: String,
    /// Generations a guest session may run before sign-in is required.
    pub guest_quota: u32,
    /// Newest history rows kept per user.
    pub history_retention: u32,
    pub bcrypt_cost: u32,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://curricula.db"),
            port: parse_env("PORT", "5050")?,
            rust_log: env_or("RUST_LOG", "info"),
            llm_base_url: env_or("LLM_BASE_URL", "http://localhost:11434"),
            llm_model: env_or("LLM_MODEL", "llama3"),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", "90")?,
            parser_mode: parse_env("PARSER_MODE", "text")?,
            strict_schema: parse_env("STRICT_SCHEMA", "false")?,
            default_duration: env_or("DEFAULT_DURATION", "1 year"),
            guest_quota: parse_env("GUEST_QUOTA", "3")?,
            history_retention: parse_env("HISTORY_RETENTION", "10")?,
            bcrypt_cost: parse_env("BCRYPT_COST", "12")?,
            cookie_secure: parse_env("COOKIE_SECURE", "false")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_or(key, default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'"))
}

#[cfg(test)]
impl Config {
    /// In-memory database, cheap bcrypt and a small guest quota.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            llm_base_url: "http://127.0.0.1:9".to_string(),
            llm_model: "test-model".to_string(),
            llm_timeout_secs: 5,
            parser_mode: ParserMode::Text,
            strict_schema: false,
            default_duration: "1 year".to_string(),
            guest_quota: 2,
            history_retention: 3,
            bcrypt_cost: 4,
            cookie_secure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_mode_from_str() {
        assert_eq!("text".parse::<ParserMode>().unwrap(), ParserMode::Text);
        assert_eq!(" JSON ".parse::<ParserMode>().unwrap(), ParserMode::Json);
        assert!("yaml".parse::<ParserMode>().is_err());
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("CURRICULUM_API_TEST_UNSET_VAR", "7").unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_parse_env_rejects_malformed_default() {
        let result: Result<u16> = parse_env("CURRICULUM_API_TEST_UNSET_PORT", "not-a-port");
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("CURRICULUM_API_TEST_UNSET_PORT"));
    }
}
