use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use planner_core::model::{StudyItemId, StudySessionId};

use crate::dto::{
    CreateSessionRequest, CreateStudyItemRequest, DeletedResponse, GeneratePlanRequest,
    PlannedItemResponse, SessionChangeResponse, StudyItemDto, StudySessionDto,
    UpdateStudyItemRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// GET /api/study-items
pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<StudyItemDto>>, ApiError> {
    let items = state.services.study_items().list_items().await?;
    Ok(Json(items.iter().map(StudyItemDto::from).collect()))
}

/// POST /api/study-items
///
/// With `totalHours`, the generated week of sessions is stored together with
/// the item.
pub async fn create_item(
    State(state): State<AppState>,
    body: Result<Json<CreateStudyItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlannedItemResponse>), ApiError> {
    let Json(body) = body?;
    let planned = state
        .services
        .study_items()
        .create_item(body.into_new_item())
        .await?;
    Ok((StatusCode::CREATED, Json(PlannedItemResponse::from(&planned))))
}

/// GET /api/study-items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<StudyItemId>,
) -> Result<Json<StudyItemDto>, ApiError> {
    let item = state.services.study_items().get_item(&id).await?;
    Ok(Json(StudyItemDto::from(&item)))
}

/// PATCH /api/study-items/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<StudyItemId>,
    body: Result<Json<UpdateStudyItemRequest>, JsonRejection>,
) -> Result<Json<StudyItemDto>, ApiError> {
    let Json(body) = body?;
    let item = state
        .services
        .study_items()
        .update_item(&id, body.into_patch()?)
        .await?;
    Ok(Json(StudyItemDto::from(&item)))
}

/// DELETE /api/study-items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<StudyItemId>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.services.study_items().delete_item(&id).await?;
    Ok(Json(DeletedResponse {
        deleted: id.to_string(),
        item_progress: None,
    }))
}

/// POST /api/study-items/:id/generate
pub async fn generate_plan(
    State(state): State<AppState>,
    Path(id): Path<StudyItemId>,
    body: Result<Json<GeneratePlanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PlannedItemResponse>), ApiError> {
    let Json(body) = body?;
    let planned = state
        .services
        .study_items()
        .generate_plan(&id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(PlannedItemResponse::from(&planned))))
}

/// GET /api/study-items/:id/sessions
pub async fn list_item_sessions(
    State(state): State<AppState>,
    Path(id): Path<StudyItemId>,
) -> Result<Json<Vec<StudySessionDto>>, ApiError> {
    let sessions = state.services.study_sessions().sessions_for_item(&id).await?;
    Ok(Json(sessions.iter().map(StudySessionDto::from).collect()))
}

/// POST /api/study-items/:id/sessions
pub async fn create_item_session(
    State(state): State<AppState>,
    Path(id): Path<StudyItemId>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionChangeResponse>), ApiError> {
    let Json(body) = body?;
    let change = state
        .services
        .study_sessions()
        .create_session(body.into_draft(id))
        .await?;
    Ok((StatusCode::CREATED, Json(SessionChangeResponse::from(&change))))
}

/// DELETE /api/study-items/:id/sessions/:session_id
pub async fn delete_item_session(
    State(state): State<AppState>,
    Path((id, session_id)): Path<(StudyItemId, StudySessionId)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let progress = state
        .services
        .study_sessions()
        .delete_item_session(&id, &session_id)
        .await?;
    Ok(Json(DeletedResponse {
        deleted: session_id.to_string(),
        item_progress: progress.map(|p| p.value()),
    }))
}
