#![forbid(unsafe_code)]

//! HTTP surface of the planner: JSON over axum.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use services::AppServices;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod error;
pub mod handlers;
pub mod locale;

pub use error::ApiError;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    use handlers::{calendar, messages, progress, study_items, study_sessions};

    let api = Router::new()
        .route(
            "/study-items",
            get(study_items::list_items).post(study_items::create_item),
        )
        .route(
            "/study-items/:id",
            get(study_items::get_item)
                .patch(study_items::update_item)
                .delete(study_items::delete_item),
        )
        .route(
            "/study-items/:id/sessions",
            get(study_items::list_item_sessions).post(study_items::create_item_session),
        )
        .route(
            "/study-items/:id/sessions/:session_id",
            delete(study_items::delete_item_session),
        )
        .route("/study-items/:id/generate", post(study_items::generate_plan))
        .route(
            "/study-sessions",
            get(study_sessions::list_sessions).post(study_sessions::create_sessions),
        )
        .route(
            "/study-sessions/:id",
            get(study_sessions::get_session)
                .patch(study_sessions::update_session)
                .delete(study_sessions::delete_session),
        )
        .route("/calendar/week", get(calendar::week))
        .route("/progress", get(progress::report))
        .route("/messages", get(messages::messages));

    Router::new()
        .nest("/api", api)
        .merge(handlers::health::health_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            locale::localize_errors,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
