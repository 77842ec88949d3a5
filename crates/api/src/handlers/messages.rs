use axum::extract::State;
use axum::{Extension, Json};
use services::Locale;

use crate::dto::MessagesResponse;
use crate::AppState;

/// GET /api/messages
///
/// The message table for the negotiated locale.
pub async fn messages(
    State(state): State<AppState>,
    Extension(locale): Extension<Locale>,
) -> Json<MessagesResponse> {
    let catalog = state.services.messages();
    Json(MessagesResponse {
        locale,
        messages: catalog.table(locale).clone(),
    })
}
