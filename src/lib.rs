pub mod access_log;
pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod pages;
pub mod state;
pub mod storage;

pub use app::{build_app, serve};
pub use config::AppConfig;
pub use state::AppState;
