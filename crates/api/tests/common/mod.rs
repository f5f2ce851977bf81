//! Shared helpers for API integration tests.
//!
//! The router is built with [`build_app_router`], so tests exercise the same
//! middleware stack as production, with the lifecycle engine wired to the
//! in-memory collaborators.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use lpms_api::auth::jwt::{generate_access_token, JwtConfig};
use lpms_api::config::{LogFormat, ServerConfig};
use lpms_api::router::build_app_router;
use lpms_api::state::AppState;
use lpms_core::memory::MemoryBackend;

pub const ADMIN: &str = "admin-openid";
pub const CLERK: &str = "clerk-openid";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: String::new(),
        db_max_connections: 1,
        max_upload_bytes: 1024,
        log_format: LogFormat::Pretty,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// A router plus handles on its in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub backend: MemoryBackend,
}

impl TestApp {
    /// A fresh clone of the router for one `oneshot` request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the application with an administrator ([`ADMIN`]) and a regular
/// user ([`CLERK`]) registered.
pub async fn build_test_app() -> TestApp {
    let backend = MemoryBackend::default();
    backend.users.insert(ADMIN, true).await;
    backend.users.insert(CLERK, false).await;

    let config = test_config();
    let state = AppState {
        engine: Arc::new(backend.engine()),
        pool: None,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        backend,
    }
}

/// Bearer token for `open_id`, signed with the test secret.
pub fn token(open_id: &str) -> String {
    generate_access_token(open_id, &test_config().jwt).expect("token generation should succeed")
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn authed(method: Method, uri: &str, open_id: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token(open_id)))
}

/// Send an unauthenticated GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: Router, uri: &str, open_id: &str) -> Response<Body> {
    let request = authed(Method::GET, uri, open_id).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: Router, uri: &str, open_id: &str) -> Response<Body> {
    let request = authed(Method::DELETE, uri, open_id)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn json_auth(
    method: Method,
    app: Router,
    uri: &str,
    body: Value,
    open_id: &str,
) -> Response<Body> {
    let request = authed(method, uri, open_id)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, open_id: &str) -> Response<Body> {
    json_auth(Method::POST, app, uri, body, open_id).await
}

pub async fn put_json_auth(app: Router, uri: &str, body: Value, open_id: &str) -> Response<Body> {
    json_auth(Method::PUT, app, uri, body, open_id).await
}

/// POST a single-file multipart form under the field name `file`.
pub async fn post_file_auth(
    app: Router,
    uri: &str,
    file_name: &str,
    bytes: &[u8],
    open_id: &str,
) -> Response<Body> {
    let boundary = "lpms-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = authed(Method::POST, uri, open_id)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as raw bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}
