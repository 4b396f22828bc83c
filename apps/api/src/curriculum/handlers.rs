use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use bytes::Bytes;
use tracing::{info, warn};

use crate::auth::session::{release_guest_generation, reserve_guest_generation, resolve_session};
use crate::curriculum::generator::{generate_curriculum, CurriculumRequest, ValidatedRequest};
use crate::curriculum::models::{Curriculum, CurriculumOutput};
use crate::errors::AppError;
use crate::history::store::{save_curriculum, NewHistoryRecord};
use crate::render::pdf::render_curriculum_pdf;
use crate::state::AppState;

/// POST /generate
pub async fn handle_generate(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CurriculumRequest>,
) -> Result<(CookieJar, Json<CurriculumOutput>), AppError> {
    let (jar, _, output) = run_generation(&state, jar, req).await?;
    Ok((jar, Json(output)))
}

/// POST /download-pdf
///
/// Same pipeline as `/generate`, answered with a PDF attachment.
pub async fn handle_download_pdf(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CurriculumRequest>,
) -> Result<Response, AppError> {
    let (jar, request, output) = run_generation(&state, jar, req).await?;
    let pdf = pdf_response(request.skill, output.to_curriculum()).await?;
    Ok((jar, pdf).into_response())
}

/// Session, input validation, quota, model call, then bookkeeping.
///
/// Guests reserve a generation slot before the model is called and get it
/// back if generation fails. Signed-in users get the result appended to
/// their history.
async fn run_generation(
    state: &AppState,
    jar: CookieJar,
    req: CurriculumRequest,
) -> Result<(CookieJar, ValidatedRequest, CurriculumOutput), AppError> {
    let (jar, session) = resolve_session(&state.db, jar, state.config.cookie_secure).await?;
    let request = req.validate(&state.config.default_duration)?;

    let Some(user_id) = session.user_id else {
        reserve_guest_generation(&state.db, &session.token, state.config.guest_quota).await?;

        let output = match generate_curriculum(state.llm.as_ref(), &state.config, &request).await
        {
            Ok(output) => output,
            Err(e) => {
                if let Err(release) = release_guest_generation(&state.db, &session.token).await {
                    warn!("Failed to return guest generation slot: {release}");
                }
                return Err(e);
            }
        };
        info!(
            "Guest generation completed (quota {})",
            state.config.guest_quota
        );
        return Ok((jar, request, output));
    };

    let output = generate_curriculum(state.llm.as_ref(), &state.config, &request).await?;
    let serialized = serde_json::to_string(&output).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Failed to serialize curriculum: {e}"))
    })?;
    save_curriculum(
        &state.db,
        NewHistoryRecord {
            user_id,
            skill: &request.skill,
            duration: &request.duration,
            curriculum: &serialized,
        },
        state.config.history_retention,
    )
    .await?;

    Ok((jar, request, output))
}

/// Renders off the async runtime and wraps the bytes as an attachment.
pub(crate) async fn pdf_response(
    skill: String,
    curriculum: Curriculum,
) -> Result<Response, AppError> {
    let filename = pdf_filename(&skill);
    let bytes = tokio::task::spawn_blocking(move || render_curriculum_pdf(&skill, &curriculum))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF render: {e}")))?
        .map_err(AppError::Internal)?;

    info!("Rendered {filename} ({} bytes)", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        Bytes::from(bytes),
    )
        .into_response())
}

/// `<skill with underscores>_curriculum.pdf`, restricted to header-safe ASCII.
pub(crate) fn pdf_filename(skill: &str) -> String {
    let stem: String = skill
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            '"' | '\\' => None,
            c if c.is_ascii_graphic() => Some(c),
            _ => None,
        })
        .collect();
    format!("{stem}_curriculum.pdf")
}
