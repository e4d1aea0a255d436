//! Download manager handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tubefetch_models::{DownloadOption, DOWNLOAD_OPTIONS};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::SessionView;
use crate::state::AppState;

/// Download option catalog response.
#[derive(Serialize)]
pub struct DownloadOptionsResponse {
    pub options: &'static [DownloadOption],
    pub default_index: usize,
}

/// List the download option catalog.
pub async fn list_download_options() -> Json<DownloadOptionsResponse> {
    Json(DownloadOptionsResponse {
        options: &DOWNLOAD_OPTIONS,
        default_index: 0,
    })
}

/// Select option request.
#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub index: usize,
}

/// Choose a download option.
pub async fn select_download_option(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    payload: Result<Json<SelectOptionRequest>, JsonRejection>,
) -> ApiResult<Json<SessionView>> {
    let Json(request) = payload?;
    let session = state.sessions.get(session_id).await?;
    let view = state.sessions.select_option(&session, request.index).await?;
    Ok(Json(view))
}

/// Start the simulated download.
pub async fn start_download(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(session_id).await?;
    let view = state.sessions.start_download(&session).await?;
    Ok(Json(view))
}

/// Return a completed download to idle.
pub async fn reset_download(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(session_id).await?;
    let view = state.sessions.reset_download(&session).await?;
    Ok(Json(view))
}
