//! HTTP tests against an in-memory planner.

use api::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use planner_core::time::fixed_now;
use serde_json::{json, Value};
use services::{AppServices, Clock, PlannerSettings};
use tower::util::ServiceExt; // for `oneshot`

fn setup_app() -> Router {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()), &PlannerSettings::default())
        .expect("in-memory services");
    build_router(AppState::new(services))
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

async fn create_item(app: &Router, body: Value) -> Value {
    let (status, created) = send(app, json_request("POST", "/api/study-items", &body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created
}

#[tokio::test]
async fn health_reports_ok() {
    let app = setup_app();
    let (status, body) = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn create_with_hours_returns_generated_sessions() {
    let app = setup_app();
    let created = create_item(
        &app,
        json!({ "title": "Rust", "priority": 3, "totalHours": 10, "startDate": "2024-06-03" }),
    )
    .await;

    let sessions = created["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 7);
    assert_eq!(sessions[0]["startTime"], "2024-06-03T18:00:00Z");
    assert_eq!(sessions[0]["completed"], false);
    assert_eq!(created["studyItem"]["priority"], 3);
    assert_eq!(created["studyItem"]["progressPercent"], 0);
    assert_eq!(created["unscheduledHours"], 0.0);

    let (status, list) = send(&app, empty_request("GET", "/api/study-items")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn missing_title_and_bad_hours_are_bad_requests() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/study-items", &json!({ "description": "no title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(body["details"].is_string());

    let (status, _) = send(
        &app,
        json_request("POST", "/api/study-items", &json!({ "title": "x", "totalHours": -2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, empty_request("GET", "/api/study-items")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn missing_item_is_localized_404() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        empty_request("GET", "/api/study-items/does-not-exist?locale=en"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "The requested resource was not found.");

    let request = Request::builder()
        .uri("/api/study-items/does-not-exist")
        .header(header::ACCEPT_LANGUAGE, "ja-JP,ja;q=0.9")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "指定されたリソースが見つかりません。");
}

#[tokio::test]
async fn completing_sessions_updates_progress() {
    let app = setup_app();
    let created = create_item(&app, json!({ "title": "Math", "totalHours": 5 })).await;
    let item_id = created["studyItem"]["id"].as_str().unwrap().to_owned();

    let (_, sessions) = send(
        &app,
        empty_request("GET", &format!("/api/study-items/{item_id}/sessions")),
    )
    .await;
    let sessions = sessions.as_array().unwrap().clone();
    assert_eq!(sessions.len(), 7);

    let session_id = sessions[0]["id"].as_str().unwrap();
    let (status, change) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/study-sessions/{session_id}"),
            &json!({ "completed": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["session"]["completed"], true);
    assert_eq!(change["session"]["studyItem"]["title"], "Math");
    assert_eq!(change["itemProgressPercent"], 14);

    let (_, item) = send(&app, empty_request("GET", &format!("/api/study-items/{item_id}"))).await;
    assert_eq!(item["progressPercent"], 14);

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/study-items/{item_id}"),
            &json!({ "progress": 1.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn empty_session_patch_is_rejected() {
    let app = setup_app();
    let created = create_item(&app, json!({ "title": "Art", "totalHours": 1 })).await;
    let session_id = created["sessions"][0]["id"].as_str().unwrap().to_owned();

    let (status, _) = send(
        &app,
        json_request("PATCH", &format!("/api/study-sessions/{session_id}"), &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/study-sessions", &json!({ "sessions": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/study-sessions",
            &json!({ "sessions": [{
                "studyItemId": "",
                "startTime": "2024-06-03T18:00:00Z",
                "endTime": "2024-06-03T19:00:00Z"
            }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn item_scoped_session_routes() {
    let app = setup_app();
    let created = create_item(&app, json!({ "title": "History" })).await;
    let item_id = created["studyItem"]["id"].as_str().unwrap().to_owned();

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/study-items/{item_id}/sessions"),
            &json!({
                "startTime": "2024-06-03T18:00:00Z",
                "endTime": "2024-06-03T18:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, change) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/study-items/{item_id}/sessions"),
            &json!({
                "startTime": "2024-06-03T18:00:00Z",
                "endTime": "2024-06-03T19:30:00Z",
                "completed": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(change["session"]["durationHours"], 1.5);
    assert_eq!(change["itemProgress"], 1.0);
    let session_id = change["session"]["id"].as_str().unwrap().to_owned();

    let (status, listed) = send(
        &app,
        empty_request("GET", &format!("/api/study-sessions?studyItemId={item_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        empty_request(
            "DELETE",
            &format!("/api/study-items/other-item/sessions/{session_id}"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, deleted) = send(
        &app,
        empty_request(
            "DELETE",
            &format!("/api/study-items/{item_id}/sessions/{session_id}"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], session_id);
}

#[tokio::test]
async fn calendar_week_lists_events_in_window() {
    let app = setup_app();
    create_item(
        &app,
        json!({ "title": "Violin", "totalHours": 7, "startDate": "2024-06-05" }),
    )
    .await;

    let (status, week) = send(&app, empty_request("GET", "/api/calendar/week?date=2024-06-05")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(week["weekStart"], "2024-06-02");
    assert_eq!(week["weekEnd"], "2024-06-08");
    let events = week["events"].as_array().unwrap();
    // Wednesday through Saturday.
    assert_eq!(events.len(), 4);
    assert_eq!(events[0]["dayOfWeek"], 3);
    assert_eq!(events[0]["time"], "18:00");
    assert_eq!(events[0]["durationHours"], 1.0);

    let (status, _) = send(&app, empty_request("GET", "/api/calendar/week?date=not-a-date")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn progress_and_messages_endpoints() {
    let app = setup_app();
    create_item(&app, json!({ "title": "Chess", "priority": 2 })).await;

    let (status, report) = send(&app, empty_request("GET", "/api/progress")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"]["notStarted"], 1);
    assert_eq!(report["priorities"][1]["label"], "medium");
    assert_eq!(report["priorities"][1]["count"], 1);
    assert_eq!(report["daily"].as_array().unwrap().len(), 7);

    let (status, messages) = send(&app, empty_request("GET", "/api/messages?locale=en")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages["locale"], "en");
    assert_eq!(messages["messages"]["navigation"]["calendar"], "Calendar");

    let (_, messages) = send(&app, empty_request("GET", "/api/messages")).await;
    assert_eq!(messages["locale"], "ja");
}

#[tokio::test]
async fn dates_at_the_calendar_edge_are_bad_requests() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/study-items?locale=en",
            &json!({ "title": "x", "totalHours": 7, "startDate": "+262142-12-31" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "The date is outside the supported range.");

    let (_, items) = send(&app, empty_request("GET", "/api/study-items")).await;
    assert!(items.as_array().unwrap().is_empty());

    let (status, body) = send(
        &app,
        empty_request("GET", "/api/calendar/week?date=%2B262142-12-31&locale=en"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "The date is outside the supported range.");
}
