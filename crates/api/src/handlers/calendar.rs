use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;

use crate::dto::{WeekQuery, WeekResponse};
use crate::error::ApiError;
use crate::AppState;

/// GET /api/calendar/week?date=YYYY-MM-DD
pub async fn week(
    State(state): State<AppState>,
    query: Result<Query<WeekQuery>, QueryRejection>,
) -> Result<Json<WeekResponse>, ApiError> {
    let Query(query) = query?;
    let view = state.services.calendar().week(query.date).await?;
    Ok(Json(WeekResponse::from(&view)))
}
