use std::net::SocketAddr;

use axum::{
    http::{header, Method, StatusCode},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{access_log, auth, pages};

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(access_log::router())
        .merge(pages::router())
        .fallback(not_found)
        .with_state(state)
        .layer(cors())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_auth(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth")
            .header(header::CONTENT_TYPE, "application/json")
            .header("cf-connecting-ip", "203.0.113.5")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn signup_then_duplicate_signup() {
        let app = build_app(AppState::fake());

        let (status, json) = call(
            &app,
            post_auth(r#"{"action":"signup","email":"Test@Example.com","password":"x"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["email"], "test@example.com");
        assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, json) = call(
            &app,
            post_auth(r#"{"action":"signup","email":"test@example.com","password":"y"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, serde_json::json!({ "error": "user already exists" }));
    }

    #[tokio::test]
    async fn login_unknown_account_is_401() {
        let app = build_app(AppState::fake());
        let (status, json) = call(
            &app,
            post_auth(r#"{"action":"login","email":"ghost@example.com","password":"x"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "invalid credentials");
    }

    #[tokio::test]
    async fn missing_fields_and_bad_action_are_400() {
        let app = build_app(AppState::fake());
        let (status, json) =
            call(&app, post_auth(r#"{"action":"signup","email":"a@b.com"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "email and password are required");

        let (status, json) = call(
            &app,
            post_auth(r#"{"action":"reset","email":"a@b.com","password":"x"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid action");
    }

    #[tokio::test]
    async fn malformed_body_is_500() {
        let app = build_app(AppState::fake());
        let (status, json) = call(&app, post_auth("{not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal error");
    }

    #[tokio::test]
    async fn array_body_is_500_and_creates_nothing() {
        let app = build_app(AppState::fake());
        let (status, json) = call(&app, post_auth(r#"["signup","d@b.com","x"]"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal error");

        let (status, _) = call(
            &app,
            post_auth(r#"{"action":"login","email":"d@b.com","password":"x"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_string_fields_follow_truthiness() {
        let app = build_app(AppState::fake());
        let (status, json) = call(
            &app,
            post_auth(r#"{"action":"signup","email":"n@b.com","password":5}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["email"], "n@b.com");

        let (status, json) = call(
            &app,
            post_auth(r#"{"action":7,"email":"n@b.com","password":"x"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid action");

        let (status, json) = call(
            &app,
            post_auth(r#"{"action":"login","email":"n@b.com","password":0}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "email and password are required");

        let (status, _) = call(
            &app,
            post_auth(r#"{"action":"login","email":12,"password":"x"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn logs_list_newest_first_with_request_meta() {
        let app = build_app(AppState::fake());
        let empty = Request::get("/api/logs").body(Body::empty()).unwrap();
        let (status, json) = call(&app, empty).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({ "logs": [] }));

        call(&app, post_auth(r#"{"action":"signup","email":"a@b.com","password":"x"}"#)).await;
        call(&app, post_auth(r#"{"action":"login","email":"a@b.com","password":"z"}"#)).await;

        let req = Request::get("/api/logs").body(Body::empty()).unwrap();
        let (status, json) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let logs = json["logs"].as_array().expect("logs array");
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["action"], "login");
        assert_eq!(logs[1]["action"], "signup");
        assert_eq!(logs[0]["ip"], "203.0.113.5");
        assert_eq!(logs[0]["country"], "unknown");
    }

    #[tokio::test]
    async fn unmatched_routes_and_methods_are_404() {
        let app = build_app(AppState::fake());
        let cases = [
            (Method::GET, "/nope"),
            (Method::GET, "/api/auth"),
            (Method::POST, "/api/logs"),
        ];
        for (method, uri) in cases {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
            let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"Not Found");
        }
    }

    #[tokio::test]
    async fn pages_are_served_as_html() {
        let app = build_app(AppState::fake());
        for uri in ["/", "/login", "/login.html", "/index", "/index.html", "/logout"] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
            let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
            assert!(content_type.starts_with("text/html"), "{uri}");
        }
    }

    #[tokio::test]
    async fn responses_carry_cors_headers() {
        let app = build_app(AppState::fake());
        let req = Request::get("/api/logs")
            .header(header::ORIGIN, "https://example.org")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
