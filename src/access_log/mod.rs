use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod logger;
pub mod repo_types;

pub use logger::AccessLogger;
pub use repo_types::{AccessLogEntry, RequestMeta};

pub fn router() -> Router<AppState> {
    handlers::log_routes()
}
