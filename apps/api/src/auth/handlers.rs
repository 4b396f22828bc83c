//! Axum route handlers for sign-up, sign-in and session inspection.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::session::{end_session, resolve_session, start_session, SESSION_COOKIE};
use crate::db::timestamp_now;
use crate::errors::AppError;
use crate::models::user::UserRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub username: Option<String>,
    /// `None` for signed-in users.
    pub guest_generations_remaining: Option<u32>,
}

/// POST /signup
pub async fn handle_signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), AppError> {
    let (username, password) = validate_credentials(request)?;

    let cost = state.config.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in signup: {e}")))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {e}")))?;

    let inserted = sqlx::query(
        "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?)",
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(timestamp_now())
    .execute(&state.db)
    .await;

    let user_id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(AppError::Conflict(format!(
                "Username '{username}' is already taken"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Created user {user_id} ({username})");

    let jar = replace_session(&state, jar, user_id).await?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse { user_id, username }),
    ))
}

/// POST /login
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let (username, password) = validate_credentials(request)?;

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
        .bind(&username)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in login: {e}")))?
        .unwrap_or(false);

    if !verified {
        return Err(AppError::Unauthorized);
    }

    info!("User {} signed in", user.id);

    let jar = replace_session(&state, jar, user.id).await?;
    Ok((
        jar,
        Json(AuthResponse {
            user_id: user.id,
            username: user.username,
        }),
    ))
}

/// POST /logout
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar), AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        end_session(&state.db, cookie.value()).await?;
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((StatusCode::NO_CONTENT, jar))
}

/// GET /session
pub async fn handle_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let (jar, session) = resolve_session(&state.db, jar, state.config.cookie_secure).await?;

    let username = match session.user_id {
        Some(user_id) => {
            sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&state.db)
                .await?
        }
        None => None,
    };

    Ok((
        jar,
        Json(SessionResponse {
            authenticated: session.is_authenticated(),
            username,
            guest_generations_remaining: session
                .guest_generations_remaining(state.config.guest_quota),
        }),
    ))
}

fn validate_credentials(request: CredentialsRequest) -> Result<(String, String), AppError> {
    let username = request.username.trim().to_string();
    if username.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "username and password are required".to_string(),
        ));
    }
    Ok((username, request.password))
}

/// Drops the current session (if any) and starts one bound to `user_id`.
async fn replace_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i64,
) -> Result<CookieJar, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        end_session(&state.db, cookie.value()).await?;
    }
    let (jar, _) = start_session(&state.db, jar, Some(user_id), state.config.cookie_secure).await?;
    Ok(jar)
}
