use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token             TEXT PRIMARY KEY,
        user_id           INTEGER REFERENCES users(id) ON DELETE CASCADE,
        guest_generations INTEGER NOT NULL DEFAULT 0,
        created_at        TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS search_history (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        timestamp  TEXT NOT NULL,
        skill      TEXT NOT NULL,
        duration   TEXT NOT NULL,
        curriculum TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_search_history_user ON search_history (user_id, timestamp)",
];

/// Creates the SQLite pool and makes sure the schema exists.
///
/// `sqlite::memory:` databases live per connection, so callers using one
/// should pass `max_connections = 1`.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    info!("Opening SQLite database at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("Invalid DATABASE_URL '{database_url}'"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("Failed to open SQLite database")?;

    init_schema(&pool).await?;

    info!("SQLite pool established");
    Ok(pool)
}

/// Current UTC time in the stored `YYYY-MM-DD HH:MM:SS` form.
pub fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to apply schema")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_pool_on_disk_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());

        let pool = create_pool(&url, 2).await.unwrap();
        pool.close().await;

        // Reopening must not fail on the existing tables.
        let pool = create_pool(&url, 2).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_history")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_timestamp_now_format() {
        let ts = timestamp_now();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
