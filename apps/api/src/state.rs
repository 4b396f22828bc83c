use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Curriculum generator backend. Default: `LlmClient`; tests swap in a stub.
    pub llm: Arc<dyn TextGenerator>,
    pub config: Config,
}
