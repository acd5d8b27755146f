use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    access_log::AccessLogEntry, app::not_found, errors::ApiError, state::AppState,
};

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<AccessLogEntry>,
}

pub fn log_routes() -> Router<AppState> {
    Router::new().route("/api/logs", get(list_logs).fallback(not_found))
}

/// GET /api/logs: the global feed, newest first.
#[instrument(skip(state))]
pub async fn list_logs(State(state): State<AppState>) -> Result<Json<LogsResponse>, ApiError> {
    let logs = state
        .logger
        .list()
        .await
        .map_err(ApiError::LogsUnavailable)?;
    Ok(Json(LogsResponse { logs }))
}
