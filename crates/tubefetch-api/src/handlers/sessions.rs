//! Session lifecycle handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::services::SessionView;
use crate::state::AppState;

/// Create session response.
#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

/// Create a new session.
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id(),
        }),
    )
}

/// Get the current view of a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = state.sessions.get(session_id).await?;
    Ok(Json(session.view().await))
}

/// Delete a session, stopping its timers.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.sessions.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
