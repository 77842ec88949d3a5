use axum::extract::State;
use axum::Json;

use crate::dto::ProgressReportDto;
use crate::error::ApiError;
use crate::AppState;

/// GET /api/progress
pub async fn report(State(state): State<AppState>) -> Result<Json<ProgressReportDto>, ApiError> {
    let report = state.services.analytics().report().await?;
    Ok(Json(ProgressReportDto::from(&report)))
}
