//! Preview panel insight handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tubefetch_models::AiInsights;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// Insight request.
#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    #[serde(default)]
    pub title: String,
}

/// Insight response.
#[derive(Serialize)]
pub struct InsightsResponse {
    pub insights: AiInsights,
    /// Tags rendered as hashtags
    pub display_tags: Vec<String>,
    /// `live` or `fallback`
    pub source: &'static str,
}

/// Generate insights for the current video from a manually entered title.
pub async fn generate_insights(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<InsightsRequest>, JsonRejection>,
) -> ApiResult<Json<InsightsResponse>> {
    let Json(request) = payload?;
    let session = state.sessions.get(session_id).await?;
    let outcome = state
        .sessions
        .generate_insights(&session, &request.title)
        .await?;

    let source = outcome.source();
    let insights = outcome.into_insights();
    Ok(Json(InsightsResponse {
        display_tags: insights.display_tags(),
        insights,
        source,
    }))
}
