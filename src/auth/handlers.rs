use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    access_log::RequestMeta,
    app::not_found,
    auth::dto::{AuthRequest, AuthResponse},
    errors::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/api/auth", post(authenticate).fallback(not_found))
}

/// POST /api/auth { action, email, password }
///
/// The body is decoded by hand: a body that is not a JSON object is an internal error,
/// while missing fields are reported by the service as validation errors.
#[instrument(skip(state, headers, body))]
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AuthResponse>, ApiError> {
    let body: serde_json::Value =
        serde_json::from_slice(&body).context("decode auth request body")?;
    let request = AuthRequest::from_json(body)?;
    let meta = RequestMeta::from_headers(&headers);
    let response = state.auth.authenticate(request, meta).await?;
    Ok(Json(response))
}
