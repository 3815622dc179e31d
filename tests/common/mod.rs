#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use markethub_gate::{
    ServerConfig, auth::PathPolicy, create_app, db::Database, rate_limit::RateLimitConfig,
};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-of-at-least-32-bytes";
pub const PASSWORD: &str = "correct horse battery";

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        secure_cookies: false,
        access_token_secs: 30 * 60,
        refresh_token_secs: 14 * 24 * 60 * 60,
        ip_header: None,
        rate_limit: RateLimitConfig::new(1000, 1000),
        policy: PathPolicy::default(),
    }
}

pub async fn create_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let app = create_app(&test_config(db.clone()));
    (app, db)
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn request_with_refresh_cookie(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("refreshToken={}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the refreshToken cookie set by a response.
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    set_cookies(response).into_iter().find_map(|c| {
        c.split(';')
            .next()?
            .strip_prefix("refreshToken=")
            .map(str::to_string)
    })
}

/// Whether the response clears the refresh cookie.
pub fn clears_refresh_cookie(response: &Response<Body>) -> bool {
    set_cookies(response)
        .iter()
        .any(|c| c.starts_with("refreshToken=;") && c.contains("Max-Age=0"))
}

pub async fn signup(app: &Router, email: &str, username: &str) -> serde_json::Value {
    let body = format!(
        r#"{{"email": "{}", "username": "{}", "password": "{}"}}"#,
        email, username, PASSWORD
    );
    let response = send(app, json_request("POST", "/api/user/signup", &body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

pub async fn login(app: &Router, email: &str, password: &str) -> Response<Body> {
    let body = format!(r#"{{"email": "{}", "password": "{}"}}"#, email, password);
    send(app, json_request("POST", "/api/auth/login", &body)).await
}

/// Sign up and log in a user. Returns (access token, refresh token).
pub async fn signup_and_login(app: &Router, email: &str, username: &str) -> (String, String) {
    signup(app, email, username).await;
    let response = login(app, email, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let refresh = refresh_cookie_value(&response).expect("login should set refresh cookie");
    let json = body_json(response).await;
    let access = json["access_token"].as_str().unwrap().to_string();
    (access, refresh)
}
