use axum::extract::{Query, Request, State};
use axum::http::header::ACCEPT_LANGUAGE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use services::Locale;

use crate::error::ErrorPayload;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
struct LocaleQuery {
    locale: Option<String>,
}

/// Locale for a request: `?locale=`, then `Accept-Language`, then the
/// configured default.
#[must_use]
pub fn negotiate(request: &Request, fallback: Locale) -> Locale {
    let explicit = Query::<LocaleQuery>::try_from_uri(request.uri())
        .map(|Query(q)| q)
        .unwrap_or_default()
        .locale;
    let header = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    Locale::negotiate(explicit.as_deref(), header, fallback)
}

/// Stores the negotiated `Locale` as a request extension and rewrites error
/// bodies with the translated message.
pub async fn localize_errors(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let catalog = state.services.messages();
    let locale = negotiate(&request, catalog.default_locale());
    request.extensions_mut().insert(locale);

    let response = next.run(request).await;
    let Some(payload) = response.extensions().get::<ErrorPayload>().cloned() else {
        return response;
    };

    let mut localized = (
        response.status(),
        Json(json!({
            "error": catalog.lookup(locale, payload.key),
            "details": payload.details,
        })),
    )
        .into_response();
    localized.extensions_mut().insert(payload);
    localized
}
