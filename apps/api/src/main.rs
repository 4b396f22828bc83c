mod auth;
mod config;
mod curriculum;
mod db;
mod errors;
mod history;
mod llm_client;
mod models;
mod render;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting curriculum API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite (schema is created on first connect)
    let db = create_pool(&config.database_url, 5).await?;
    info!("Database ready at {}", config.database_url);

    // Initialize LLM client
    let llm = LlmClient::new(
        &config.llm_base_url,
        &config.llm_model,
        config.llm_timeout_secs,
    )?;
    info!(
        "LLM client initialized (model: {}, parser: {:?}, strict schema: {})",
        llm.model(),
        config.parser_mode,
        config.strict_schema
    );

    let state = AppState {
        db,
        llm: Arc::new(llm),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
