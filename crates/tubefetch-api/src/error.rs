//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tubefetch_lifecycle::LifecycleError;

use crate::form::FormError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Form(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) | ApiError::Lifecycle(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::BadRequest(_) => Some("invalid_body"),
            ApiError::Form(FormError::Empty) => Some("empty_url"),
            ApiError::Form(FormError::InvalidFormat) => Some("invalid_url"),
            ApiError::Lifecycle(LifecycleError::InvalidTransition { .. }) => {
                Some("invalid_transition")
            }
            ApiError::Lifecycle(LifecycleError::OptionOutOfRange { .. }) => {
                Some("option_out_of_range")
            }
            _ => None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}
