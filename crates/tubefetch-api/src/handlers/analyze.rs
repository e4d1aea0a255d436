//! Link submission handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::SessionView;
use crate::state::AppState;

/// Analyze request.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub url: String,
}

/// Submit a link. The video is located asynchronously; watch the session
/// stream or poll the session for the result.
pub async fn analyze_url(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionView>)> {
    let Json(request) = payload?;
    let session = state.sessions.get(session_id).await?;
    let view = state.sessions.analyze(&session, &request.url).await?;
    Ok((StatusCode::ACCEPTED, Json(view)))
}
