use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request failures and the status each one maps to.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("email and password are required")]
    Validation,

    #[error("invalid action")]
    InvalidAction,

    #[error("user already exists")]
    DuplicateUser,

    /// Covers both unknown accounts and bad passwords; the two are not told apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),

    #[error("failed to load access logs")]
    LogsUnavailable(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation | ApiError::InvalidAction | ApiError::DuplicateUser => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::LogsUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(e) | ApiError::LogsUnavailable(e) => {
                let cause = format!("{e:#}");
                error!(error = %cause, "request failed");
            }
            _ => {}
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}
