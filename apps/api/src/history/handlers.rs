use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::auth::session::resolve_session;
use crate::curriculum::handlers::pdf_response;
use crate::curriculum::models::Curriculum;
use crate::errors::AppError;
use crate::history::store::{delete_history, get_history, list_history};
use crate::models::history::HistoryRow;
use crate::state::AppState;

/// A saved generation with its curriculum decoded back to JSON.
#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: String,
    pub skill: String,
    pub duration: String,
    pub curriculum: Value,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        let curriculum = serde_json::from_str(&row.curriculum).unwrap_or_else(|e| {
            warn!("History record {} holds invalid JSON: {e}", row.id);
            Value::Null
        });
        HistoryEntry {
            id: row.id,
            timestamp: row.timestamp,
            skill: row.skill,
            duration: row.duration,
            curriculum,
        }
    }
}

/// GET /history
pub async fn handle_list_history(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Vec<HistoryEntry>>), AppError> {
    let (jar, user_id) = signed_in_user(&state, jar).await?;
    let rows = list_history(&state.db, user_id).await?;
    Ok((jar, Json(rows.into_iter().map(HistoryEntry::from).collect())))
}

/// GET /history/:id
pub async fn handle_get_history(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<(CookieJar, Json<HistoryEntry>), AppError> {
    let (jar, user_id) = signed_in_user(&state, jar).await?;
    let row = owned_record(&state, user_id, id).await?;
    Ok((jar, Json(row.into())))
}

/// DELETE /history/:id
pub async fn handle_delete_history(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<(StatusCode, CookieJar), AppError> {
    let (jar, user_id) = signed_in_user(&state, jar).await?;
    if !delete_history(&state.db, user_id, id).await? {
        return Err(AppError::NotFound(format!("History record {id} not found")));
    }
    Ok((StatusCode::NO_CONTENT, jar))
}

/// GET /history/:id/pdf
pub async fn handle_history_pdf(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let (jar, user_id) = signed_in_user(&state, jar).await?;
    let row = owned_record(&state, user_id, id).await?;

    let value: Value = serde_json::from_str(&row.curriculum).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("History record {id} holds invalid JSON: {e}"))
    })?;
    let pdf = pdf_response(row.skill, Curriculum::from_value(&value)).await?;
    Ok((jar, pdf).into_response())
}

async fn signed_in_user(state: &AppState, jar: CookieJar) -> Result<(CookieJar, i64), AppError> {
    let (jar, session) = resolve_session(&state.db, jar, state.config.cookie_secure).await?;
    let user_id = session.require_user()?;
    Ok((jar, user_id))
}

/// Records of other users look exactly like missing ones.
async fn owned_record(state: &AppState, user_id: i64, id: i64) -> Result<HistoryRow, AppError> {
    get_history(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("History record {id} not found")))
}
