//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS,
//! and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (presence only)
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/register", post(http::http_register))
        .route("/api/v1/login", post(http::http_login))
        .route("/api/v1/profile", get(http::http_profile))
        .route("/api/v1/levels/:language", get(http::http_levels))
        .route("/api/v1/submit", post(http::http_submit))
        .route("/api/v1/progress", get(http::http_progress))
        .route("/api/v1/leaderboard", get(http::http_leaderboard))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::store::Db;

    fn test_app() -> Router {
        let state = AppState::with_db(Db::open_in_memory().unwrap());
        state.seed().unwrap();
        build_router(Arc::new(state))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, name: &str) -> String {
        let (status, body) = send(
            app,
            post_json(
                "/api/v1/register",
                json!({ "username": name, "email": format!("{name}@example.com"), "password": "hunter22" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = test_app();
        let (status, body) = send(&app, get("/api/v1/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn levels_are_public_and_withhold_the_solution() {
        let app = test_app();
        let (status, body) = send(&app, get("/api/v1/levels/html", None)).await;
        assert_eq!(status, StatusCode::OK);
        let levels = body.as_array().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0]["levelNumber"], json!(1));
        assert!(levels[0].get("solution").is_none());
    }

    #[tokio::test]
    async fn submit_requires_authentication() {
        let app = test_app();
        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/submit",
                json!({ "language": "html", "levelNumber": 1, "solution": "<h1>Hello World</h1>" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submit_accept_resubmit_and_leaderboard_flow() {
        let app = test_app();
        let token = register(&app, "ada").await;

        let submit = json!({ "language": "html", "levelNumber": 1, "solution": "<h1>Hello World</h1>" });
        let (status, body) = send(&app, post_json("/api/v1/submit", submit.clone(), Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["points"], json!(10));
        assert_eq!(body["nextLevel"], json!(2));

        // Resubmission: same payload back, no second credit.
        let (_, body) = send(&app, post_json("/api/v1/submit", submit, Some(&token))).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["points"], json!(10));

        let (_, profile) = send(&app, get("/api/v1/profile", Some(&token))).await;
        assert_eq!(profile["score"], json!(10));

        let (_, board) = send(&app, get("/api/v1/leaderboard", None)).await;
        assert_eq!(board[0]["username"], json!("ada"));
        assert_eq!(board[0]["score"], json!(10));
    }

    #[tokio::test]
    async fn wrong_answer_returns_hint_and_no_score() {
        let app = test_app();
        let token = register(&app, "ada").await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/submit",
                json!({ "language": "html", "levelNumber": 1, "solution": "<h2>Hello World</h2>" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["hint"], json!("Use the h1 tag to create a main heading"));

        let (_, progress) = send(&app, get("/api/v1/progress", Some(&token))).await;
        assert_eq!(progress.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn unknown_level_is_404() {
        let app = test_app();
        let token = register(&app, "ada").await;
        let (status, _) = send(
            &app,
            post_json(
                "/api/v1/submit",
                json!({ "language": "html", "levelNumber": 999, "solution": "<h1>Hello World</h1>" }),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let app = test_app();
        register(&app, "ada").await;
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/register",
                json!({ "username": "ada", "email": "ada@example.com", "password": "hunter22" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn login_round_trip() {
        let app = test_app();
        register(&app, "ada").await;

        let (status, body) = send(
            &app,
            post_json("/api/v1/login", json!({ "username": "ada", "password": "hunter22" }), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["user"]["username"], json!("ada"));

        let (status, _) = send(
            &app,
            post_json("/api/v1/login", json!({ "username": "ada", "password": "wrong" }), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
