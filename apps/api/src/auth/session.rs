//! Cookie-backed sessions.
//!
//! Every visitor gets a `session` cookie holding a random token. The row
//! behind it carries the signed-in user (if any) and the guest generation
//! counter used for the guest quota.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::db::timestamp_now;
use crate::errors::AppError;
use crate::models::user::SessionRow;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: Option<i64>,
    pub guest_generations: i64,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The signed-in user, or 401.
    pub fn require_user(&self) -> Result<i64, AppError> {
        self.user_id.ok_or(AppError::Unauthorized)
    }

    pub fn guest_generations_remaining(&self, quota: u32) -> Option<u32> {
        if self.is_authenticated() {
            return None;
        }
        let used = u32::try_from(self.guest_generations).unwrap_or(u32::MAX);
        Some(quota.saturating_sub(used))
    }
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            token: row.token,
            user_id: row.user_id,
            guest_generations: row.guest_generations,
        }
    }
}

/// Loads the session named by the cookie, or starts a guest session.
///
/// The returned jar carries the cookie for a new session and must be part
/// of the response.
pub async fn resolve_session(
    pool: &SqlitePool,
    jar: CookieJar,
    secure: bool,
) -> Result<(CookieJar, Session), AppError> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE token = ?")
            .bind(&token)
            .fetch_optional(pool)
            .await?;
        if let Some(row) = row {
            return Ok((jar, row.into()));
        }
        debug!("Unknown session cookie, starting a new guest session");
    }

    start_session(pool, jar, None, secure).await
}

/// Inserts a fresh session row and sets its cookie.
pub async fn start_session(
    pool: &SqlitePool,
    jar: CookieJar,
    user_id: Option<i64>,
    secure: bool,
) -> Result<(CookieJar, Session), AppError> {
    let token = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, guest_generations, created_at) VALUES (?, ?, 0, ?)",
    )
    .bind(&token)
    .bind(user_id)
    .bind(timestamp_now())
    .execute(pool)
    .await?;

    let jar = jar.add(session_cookie(token.clone(), secure));
    Ok((
        jar,
        Session {
            token,
            user_id,
            guest_generations: 0,
        },
    ))
}

/// Claims one guest generation before the model is called.
///
/// Check and increment are a single statement, so concurrent requests on one
/// cookie cannot overshoot `quota`. Signed-in sessions are never charged.
/// Returns `QuotaExceeded` when no slot is left.
pub async fn reserve_guest_generation(
    pool: &SqlitePool,
    token: &str,
    quota: u32,
) -> Result<(), AppError> {
    let claimed = sqlx::query(
        r#"
        UPDATE sessions SET guest_generations = guest_generations + 1
        WHERE token = ? AND user_id IS NULL AND guest_generations < ?
        "#,
    )
    .bind(token)
    .bind(i64::from(quota))
    .execute(pool)
    .await?
    .rows_affected();

    if claimed == 0 {
        debug!("Guest quota of {quota} used up");
        return Err(AppError::QuotaExceeded);
    }
    Ok(())
}

/// Hands back a slot taken by `reserve_guest_generation` when the
/// generation failed.
pub async fn release_guest_generation(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE sessions SET guest_generations = guest_generations - 1 \
         WHERE token = ? AND guest_generations > 0",
    )
    .bind(token)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn end_session(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}
