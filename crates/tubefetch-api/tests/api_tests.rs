//! API integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tubefetch_api::services::{InsightGenerator, InsightOutcome};
use tubefetch_api::{create_router, ApiConfig, AppState, SessionService};
use tubefetch_lifecycle::{LifecycleConfig, VirtualClock};
use tubefetch_models::{AiInsights, Sentiment};

const VALID_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// Generator that answers without a network call.
struct StubGenerator {
    live: bool,
}

#[async_trait]
impl InsightGenerator for StubGenerator {
    async fn generate(&self, _title: &str) -> InsightOutcome {
        if !self.live {
            return InsightOutcome::Fallback {
                insights: AiInsights::fallback(),
                reason: "API key missing".to_string(),
            };
        }
        InsightOutcome::Live(AiInsights {
            summary: "A pop classic. Expect dancing.".to_string(),
            tags: ["music", "80s", "pop", "dance", "classic hits"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            sentiment: Sentiment::Positive,
            suggested_file_name: "never-gonna-give-you-up".to_string(),
        })
    }

    fn is_live(&self) -> bool {
        self.live
    }
}

fn test_state(live: bool) -> AppState {
    let sessions = SessionService::new(
        Arc::new(VirtualClock::new()),
        Arc::new(StubGenerator { live }),
        LifecycleConfig {
            seed: Some(3),
            ..LifecycleConfig::default()
        },
        Duration::from_millis(800),
    );
    AppState::new(ApiConfig::default(), sessions)
}

fn test_app(live: bool) -> (Router, AppState) {
    let state = test_state(live);
    (create_router(state.clone(), None), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_session(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

/// Create a session and analyze a valid link to completion.
async fn analyzed_session(app: &Router, state: &AppState) -> String {
    let id = create_session(app).await;
    let (status, _) = send(
        app,
        "POST",
        &format!("/api/sessions/{}/analyze", id),
        Some(json!({ "url": VALID_URL })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let session = state.sessions.get(id.parse().unwrap()).await.unwrap();
    session.join_analysis().await;
    id
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = test_app(true);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = test_app(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("X-Request-ID", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "abc-123");
}

#[tokio::test]
async fn test_ready_reports_fallback_mode() {
    let (app, _) = test_app(false);
    let (status, body) = send(&app, "GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["insights"]["status"], "degraded");
}

#[tokio::test]
async fn test_metrics_disabled_without_handle() {
    let (app, _) = test_app(true);
    let (status, _) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_options_catalog() {
    let (app, _) = test_app(true);
    let (status, body) = send(&app, "GET", "/api/download/options", None).await;

    assert_eq!(status, StatusCode::OK);
    let options = body["options"].as_array().unwrap();
    assert_eq!(options.len(), 4);
    assert_eq!(options[0]["quality"], "1080p Full HD");
    assert_eq!(options[0]["badge"], "Best");
    assert_eq!(options[3]["format"], "mp3");
    assert_eq!(options[3]["size"], "8.4 MB");
    assert_eq!(body["default_index"], 0);
}

#[tokio::test]
async fn test_new_session_view() {
    let (app, _) = test_app(true);
    let id = create_session(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], id.as_str());
    assert_eq!(body["loading"], false);
    assert!(body.get("video").is_none());
    assert_eq!(body["download"]["status"], "idle");
    assert_eq!(body["selected_option"]["quality"], "1080p Full HD");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (app, _) = test_app(true);
    let (status, body) = send(
        &app,
        "GET",
        "/api/sessions/550e8400-e29b-41d4-a716-446655440000",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_invalid_links_are_rejected_without_state_change() {
    let (app, _) = test_app(true);
    let id = create_session(&app).await;
    let uri = format!("/api/sessions/{}/analyze", id);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "url": "not a url" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid YouTube URL format");
    assert_eq!(body["code"], "invalid_url");

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "url": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Please enter a YouTube URL");

    let (_, view) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(view["loading"], false);
    assert!(view.get("video").is_none());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = test_app(true);
    let id = create_session(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/sessions/{}/analyze", id))
        .header("content-type", "application/json")
        .body(Body::from("{\"url\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "invalid_body");
    assert!(!body["detail"].as_str().unwrap().is_empty());

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/sessions/{}/download/option", id),
        Some(json!({ "index": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_body");
}

#[tokio::test]
async fn test_analyze_locates_video() {
    let (app, state) = test_app(true);
    let id = create_session(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/analyze", id),
        Some(json!({ "url": VALID_URL })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["loading"], true);

    let session = state.sessions.get(id.parse().unwrap()).await.unwrap();
    session.join_analysis().await;

    let (_, view) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(view["loading"], false);
    assert_eq!(view["video"]["id"], "dQw4w9WgXcQ");
    assert_eq!(view["video"]["url"], VALID_URL);
    assert_eq!(
        view["video"]["thumbnail_url"],
        "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
    );
    assert_eq!(view["display_title"], "Video Found");
}

#[tokio::test]
async fn test_insights_flow() {
    let (app, state) = test_app(true);
    let id = analyzed_session(&app, &state).await;
    let uri = format!("/api/sessions/{}/insights", id);

    let (status, body) = send(&app, "POST", &uri, Some(json!({ "title": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Please enter a video title");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "title": "Never Gonna Give You Up" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "live");
    assert_eq!(body["insights"]["suggestedFileName"], "never-gonna-give-you-up");
    assert_eq!(body["insights"]["sentiment"], "positive");
    assert_eq!(body["display_tags"][4], "#classichits");

    let (_, view) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(view["display_title"], "Never Gonna Give You Up");
    assert_eq!(view["insight_source"], "live");
}

#[tokio::test]
async fn test_insights_fallback_is_schema_valid() {
    let (app, state) = test_app(false);
    let id = analyzed_session(&app, &state).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/insights", id),
        Some(json!({ "title": "Anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["insights"]["tags"].as_array().unwrap().len(), 5);
    assert_eq!(body["insights"]["sentiment"], "neutral");
    assert_eq!(body["insights"]["suggestedFileName"], "video-download");
}

#[tokio::test]
async fn test_insights_require_video() {
    let (app, _) = test_app(true);
    let id = create_session(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/insights", id),
        Some(json!({ "title": "Title" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_download_requires_video() {
    let (app, _) = test_app(true);
    let id = create_session(&app).await;

    let (status, _) = send(&app, "POST", &format!("/api/sessions/{}/download", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_download_lifecycle_flow() {
    let (app, state) = test_app(true);
    let id = analyzed_session(&app, &state).await;
    let base = format!("/api/sessions/{}/download", id);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("{}/option", base),
        Some(json!({ "index": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "option_out_of_range");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("{}/option", base),
        Some(json!({ "index": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected_option"]["quality"], "720p HD");

    let (status, _) = send(&app, "POST", &format!("{}/reset", base), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["download"]["status"], "preparing");
    assert_eq!(body["download"]["progress"], 0.0);
    assert_eq!(body["download_label"], "Connecting...");

    let (status, body) = send(&app, "POST", &base, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let session = state.sessions.get(id.parse().unwrap()).await.unwrap();
    session.runner().await.join_driver().await;

    let (_, view) = send(&app, "GET", &format!("/api/sessions/{}", id), None).await;
    assert_eq!(view["download"]["status"], "completed");
    assert_eq!(view["download"]["progress"], 100.0);

    let (status, body) = send(&app, "POST", &format!("{}/reset", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["download"]["status"], "idle");
    assert_eq!(body["download"]["progress"], 0.0);

    let (status, body) = send(&app, "POST", &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["download"]["attempt"], 2);
}

#[tokio::test]
async fn test_delete_session() {
    let (app, _) = test_app(true);
    let id = create_session(&app).await;
    let uri = format!("/api/sessions/{}", id);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
