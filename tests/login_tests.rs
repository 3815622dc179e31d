mod common;

use axum::http::{StatusCode, header};
use common::*;
use markethub_gate::{create_app, db::Database, rate_limit::RateLimitConfig};

#[tokio::test]
async fn test_login_issues_tokens() {
    let (app, db) = create_test_app().await;
    signup(&app, "alice@example.com", "alice").await;

    let response = login(&app, "alice@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bearer = response
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(bearer.starts_with("Bearer "));

    let cookie = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("refreshToken="))
        .unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains(&format!("Max-Age={}", 14 * 24 * 60 * 60)));
    assert!(!cookie.contains("Secure"));

    let refresh = refresh_cookie_value(&response).unwrap();
    let json = body_json(response).await;
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 30 * 60);
    assert_eq!(json["username"], "alice");
    assert_eq!(bearer, format!("Bearer {}", json["access_token"].as_str().unwrap()));

    let subject = db
        .revocations()
        .refresh_token_subject(&refresh)
        .await
        .unwrap();
    let user = db
        .users()
        .get_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(subject, Some(user.uuid));
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let (app, _db) = create_test_app().await;
    signup(&app, "alice@example.com", "alice").await;

    let response = login(&app, "ALICE@Example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _db) = create_test_app().await;
    signup(&app, "alice@example.com", "alice").await;

    let response = login(&app, "alice@example.com", "wrong password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(refresh_cookie_value(&response).is_none());
    assert_eq!(body_json(response).await["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_login_unknown_email() {
    let (app, _db) = create_test_app().await;

    let response = login(&app, "nobody@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_disabled_user() {
    let (app, db) = create_test_app().await;
    signup(&app, "alice@example.com", "alice").await;
    let user = db
        .users()
        .get_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    db.users().set_enabled(user.id, false).await.unwrap();

    let response = login(&app, "alice@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_malformed_body() {
    let (app, _db) = create_test_app().await;

    let response = send(
        &app,
        json_request("POST", "/api/auth/login", r#"{"email": "alice@example.com"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let db = Database::open(":memory:").await.unwrap();
    let mut config = test_config(db);
    config.rate_limit = RateLimitConfig::new(1, 2);
    let app = create_app(&config);

    for _ in 0..2 {
        let response = login(&app, "nobody@example.com", PASSWORD).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = login(&app, "nobody@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let (app, db) = create_test_app().await;
    let (_, old_refresh) = signup_and_login(&app, "alice@example.com", "alice").await;

    let response = send(
        &app,
        request_with_refresh_cookie("POST", "/api/auth/refresh", &old_refresh),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::AUTHORIZATION));

    let new_refresh = refresh_cookie_value(&response).unwrap();
    assert!(!new_refresh.is_empty());
    assert_ne!(new_refresh, old_refresh);
    // Only the new cookie, no queued clear alongside it
    assert_eq!(
        set_cookies(&response)
            .iter()
            .filter(|c| c.starts_with("refreshToken="))
            .count(),
        1
    );

    assert!(
        db.revocations()
            .refresh_token_subject(&old_refresh)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        db.revocations()
            .refresh_token_subject(&new_refresh)
            .await
            .unwrap()
            .is_some()
    );

    let access = body_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let me = send(&app, get_with_bearer("/api/auth/me", &access)).await;
    assert_eq!(me.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token_cannot_be_reused() {
    let (app, _db) = create_test_app().await;
    let (_, old_refresh) = signup_and_login(&app, "alice@example.com", "alice").await;

    let first = send(
        &app,
        request_with_refresh_cookie("POST", "/api/auth/refresh", &old_refresh),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = send(
        &app,
        request_with_refresh_cookie("POST", "/api/auth/refresh", &old_refresh),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert!(clears_refresh_cookie(&replay));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_issues_one_pair() {
    let (app, db) = create_test_app().await;
    let (_, refresh) = signup_and_login(&app, "alice@example.com", "alice").await;

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let app = app.clone();
            let refresh = refresh.clone();
            tokio::spawn(async move {
                let response = send(
                    &app,
                    request_with_refresh_cookie("POST", "/api/auth/refresh", &refresh),
                )
                .await;
                (response.status(), refresh_cookie_value(&response))
            })
        })
        .collect();

    let mut issued = Vec::new();
    for task in tasks {
        let (status, cookie) = task.await.unwrap();
        match status {
            StatusCode::OK => issued.push(cookie.unwrap()),
            other => assert_eq!(other, StatusCode::UNAUTHORIZED),
        }
    }

    assert_eq!(issued.len(), 1);
    assert!(
        db.revocations()
            .refresh_token_subject(&issued[0])
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let (app, _db) = create_test_app().await;

    let response = send(&app, json_request("POST", "/api/auth/refresh", "")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let (app, _db) = create_test_app().await;
    let (access, _) = signup_and_login(&app, "alice@example.com", "alice").await;

    let response = send(
        &app,
        request_with_refresh_cookie("POST", "/api/auth/refresh", &access),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(clears_refresh_cookie(&response));
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let (app, db) = create_test_app().await;
    let (_, refresh) = signup_and_login(&app, "alice@example.com", "alice").await;

    let response = send(
        &app,
        request_with_refresh_cookie("POST", "/api/auth/logout", &refresh),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(clears_refresh_cookie(&response));
    assert!(
        db.revocations()
            .refresh_token_subject(&refresh)
            .await
            .unwrap()
            .is_none()
    );

    let me = send(
        &app,
        request_with_refresh_cookie("GET", "/api/auth/me", &refresh),
    )
    .await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let (app, _db) = create_test_app().await;
    let (_, refresh) = signup_and_login(&app, "alice@example.com", "alice").await;

    for _ in 0..2 {
        let response = send(
            &app,
            request_with_refresh_cookie("POST", "/api/auth/logout", &refresh),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let anonymous = send(&app, json_request("POST", "/api/auth/logout", "")).await;
    assert_eq!(anonymous.status(), StatusCode::NO_CONTENT);
}
