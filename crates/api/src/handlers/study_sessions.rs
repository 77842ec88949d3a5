use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use planner_core::model::StudySessionId;

use crate::dto::{
    BulkCreateSessionsRequest, DeletedResponse, SessionChangeResponse, SessionListQuery,
    SessionWithItemDto, StudySessionDto, UpdateSessionRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// GET /api/study-sessions?studyItemId=
pub async fn list_sessions(
    State(state): State<AppState>,
    query: Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<Json<Vec<SessionWithItemDto>>, ApiError> {
    let Query(query) = query?;
    let sessions = state
        .services
        .study_sessions()
        .list_sessions(query.study_item_id.as_ref())
        .await?;
    Ok(Json(sessions.iter().map(SessionWithItemDto::from).collect()))
}

/// POST /api/study-sessions
pub async fn create_sessions(
    State(state): State<AppState>,
    body: Result<Json<BulkCreateSessionsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<StudySessionDto>>), ApiError> {
    let Json(body) = body?;
    let sessions = state
        .services
        .study_sessions()
        .create_sessions(body.into_drafts())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(sessions.iter().map(StudySessionDto::from).collect()),
    ))
}

/// GET /api/study-sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<StudySessionId>,
) -> Result<Json<SessionWithItemDto>, ApiError> {
    let session = state.services.study_sessions().get_session(&id).await?;
    Ok(Json(SessionWithItemDto::from(&session)))
}

/// PATCH /api/study-sessions/:id
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<StudySessionId>,
    body: Result<Json<UpdateSessionRequest>, JsonRejection>,
) -> Result<Json<SessionChangeResponse>, ApiError> {
    let Json(body) = body?;
    let change = state
        .services
        .study_sessions()
        .update_session(&id, body.into())
        .await?;
    Ok(Json(SessionChangeResponse::from(&change)))
}

/// DELETE /api/study-sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<StudySessionId>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let progress = state.services.study_sessions().delete_session(&id).await?;
    Ok(Json(DeletedResponse {
        deleted: id.to_string(),
        item_progress: progress.map(|p| p.value()),
    }))
}
