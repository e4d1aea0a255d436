//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub insights: CheckStatus,
    pub sessions: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckStatus {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn degraded(detail: impl Into<String>) -> Self {
        Self {
            status: "degraded".to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// Readiness check endpoint (readiness probe).
///
/// Without a Gemini key every insight request falls back, which is reported
/// as degraded but still ready.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let insights = if state.sessions.insights_live() {
        CheckStatus::ok("live")
    } else {
        CheckStatus::degraded("API key missing, serving fallback insights")
    };

    let count = state.sessions.session_count().await;
    let sessions = CheckStatus::ok(format!("{} active", count));

    let status = if insights.status == "ok" { "ready" } else { "degraded" };

    Json(ReadinessResponse {
        status: status.to_string(),
        checks: ReadinessChecks { insights, sessions },
    })
}
