//! Static pages: the login/signup form, the reserved area, and logout.
//!
//! The pages keep the session in the browser's `localStorage` and gate themselves on it;
//! the server only hands out the markup.

use axum::{response::Html, routing::get, Router};

use crate::{app::not_found, state::AppState};

const LOGIN_HTML: &str = include_str!("../../assets/login.html");
const INDEX_HTML: &str = include_str!("../../assets/index.html");
const LOGOUT_HTML: &str = include_str!("../../assets/logout.html");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(login_page).fallback(not_found))
        .route("/login", get(login_page).fallback(not_found))
        .route("/login.html", get(login_page).fallback(not_found))
        .route("/index", get(index_page).fallback(not_found))
        .route("/index.html", get(index_page).fallback(not_found))
        .route("/logout", get(logout_page).fallback(not_found))
}

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_HTML)
}

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn logout_page() -> Html<&'static str> {
    Html(LOGOUT_HTML)
}
