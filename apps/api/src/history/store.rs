use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::timestamp_now;
use crate::models::history::HistoryRow;

/// Fields of a generation to persist.
pub struct NewHistoryRecord<'a> {
    pub user_id: i64,
    pub skill: &'a str,
    pub duration: &'a str,
    /// Serialized curriculum.
    pub curriculum: &'a str,
}

/// Appends a record, then trims the user's history to the newest `retention`
/// rows. Both statements share one transaction; on error nothing is written.
///
/// Two concurrent trims can both run against the same snapshot; the next save
/// converges the row count again.
pub async fn save_curriculum(
    pool: &SqlitePool,
    record: NewHistoryRecord<'_>,
    retention: u32,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        r#"
        INSERT INTO search_history (user_id, timestamp, skill, duration, curriculum)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.user_id)
    .bind(timestamp_now())
    .bind(record.skill)
    .bind(record.duration)
    .bind(record.curriculum)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let trimmed = sqlx::query(
        r#"
        DELETE FROM search_history
        WHERE user_id = ?
          AND id NOT IN (
              SELECT id FROM search_history
              WHERE user_id = ?
              ORDER BY timestamp DESC, id DESC
              LIMIT ?
          )
        "#,
    )
    .bind(record.user_id)
    .bind(record.user_id)
    .bind(i64::from(retention))
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    info!("Saved curriculum {id} for user {}", record.user_id);
    if trimmed > 0 {
        debug!("Trimmed {trimmed} old history rows for user {}", record.user_id);
    }
    Ok(id)
}

/// The user's history, newest first.
pub async fn list_history(pool: &SqlitePool, user_id: i64) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        "SELECT * FROM search_history WHERE user_id = ? ORDER BY timestamp DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// One record, only if it belongs to `user_id`.
pub async fn get_history(
    pool: &SqlitePool,
    user_id: i64,
    id: i64,
) -> Result<Option<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>("SELECT * FROM search_history WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Returns false when there was no such record for the user.
pub async fn delete_history(pool: &SqlitePool, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM search_history WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
