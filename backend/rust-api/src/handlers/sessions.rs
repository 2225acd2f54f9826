use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    handlers::ApiError,
    models::{
        session::{JumpRequest, SelectOptionRequest},
        CreateSessionRequest,
    },
    services::AppState,
};

/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;
    tracing::info!(test = %req.test_name, "Creating session");

    let response = state.sessions.create_session(&req.test_name).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.view(&session_id).await?))
}

/// DELETE /api/v1/sessions/{id}
pub async fn teardown_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.teardown(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/{id}/answer
pub async fn select_option(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<SelectOptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(session_id = %session_id, option = %req.option, "Selecting option");
    Ok(Json(
        state.sessions.select_option(&session_id, req.option).await?,
    ))
}

/// POST /api/v1/sessions/{id}/save
pub async fn save_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.save(&session_id).await?))
}

/// POST /api/v1/sessions/{id}/next
pub async fn next_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.next(&session_id).await?))
}

/// POST /api/v1/sessions/{id}/save-and-next
pub async fn save_and_next(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.save_and_next(&session_id).await?))
}

/// POST /api/v1/sessions/{id}/previous
pub async fn previous_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.previous(&session_id).await?))
}

/// POST /api/v1/sessions/{id}/flag
pub async fn toggle_flag(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.toggle_flag(&session_id).await?))
}

/// POST /api/v1/sessions/{id}/jump
pub async fn jump_to_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<JumpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .sessions
            .jump_to(&session_id, req.question_index)
            .await?,
    ))
}

/// POST /api/v1/sessions/{id}/sections/{index}
pub async fn jump_to_section(
    State(state): State<Arc<AppState>>,
    Path((session_id, section_index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state
            .sessions
            .jump_to_section(&session_id, section_index)
            .await?,
    ))
}

/// POST /api/v1/sessions/{id}/submit
pub async fn submit_test(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(session_id = %session_id, "Manual submit requested");
    let report = state.sessions.submit(&session_id).await?;
    Ok(Json(report))
}

/// GET /api/v1/sessions/{id}/report
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.sessions.report(&session_id).await?))
}
