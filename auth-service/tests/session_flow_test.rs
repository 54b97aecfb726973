mod common;

use axum::http::StatusCode;
use common::{header, read_json, TestApp};

fn strip_bearer(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value)
}

#[tokio::test]
async fn test_login_refresh_logout_flow() {
    let app = TestApp::spawn().await;
    app.given_local_user("a@x.com", "p1").await;

    // 1. Login
    let response = app.login("a@x.com", "p1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let access = header(&response, "authorization").unwrap().to_string();
    let refresh = header(&response, "refresh-token").unwrap().to_string();
    assert!(access.starts_with("Bearer "));
    assert!(refresh.starts_with("Bearer "));

    let body = read_json(response).await;
    assert!(body["accessTokenExpiresAt"].is_string());
    assert!(body["refreshTokenExpiresAt"].is_string());
    assert_eq!(app.sessions.len(), 1);

    // 2. Refresh twice with the same token
    let first = app.refresh(&refresh).await;
    assert_eq!(first.status(), StatusCode::OK);
    let first_access = header(&first, "authorization").unwrap().to_string();
    assert!(read_json(first).await["accessTokenExpiresAt"].is_string());

    let second = app.refresh(strip_bearer(&refresh)).await;
    assert_eq!(second.status(), StatusCode::OK);

    let tokens = app.state.auth.tokens();
    let first_claims = tokens.verify(strip_bearer(&first_access)).unwrap();
    let second_claims = tokens
        .verify(strip_bearer(header(&second, "authorization").unwrap()))
        .unwrap();
    assert_eq!(first_claims.sub, "a@x.com");
    assert!(second_claims.iat >= first_claims.iat);
    assert_eq!(app.sessions.len(), 1);

    // 3. Logout
    let response = app.logout(&refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(app.sessions.len(), 0);

    // 4. Refresh after logout
    let response = app.refresh(&refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_twice_still_succeeds() {
    let app = TestApp::spawn().await;

    for _ in 0..2 {
        let response = app.logout("Bearer never-issued").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["success"], true);
    }
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = TestApp::spawn().await;
    app.given_local_user("a@x.com", "p1").await;

    let response = app.login("a@x.com", "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(header(&response, "authorization").is_none());
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn test_invalid_login_body_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.login("not-an-email", "").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_refresh_requires_header() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/token")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_token_cannot_be_used_to_refresh() {
    let app = TestApp::spawn().await;
    app.given_local_user("a@x.com", "p1").await;

    let response = app.login("a@x.com", "p1").await;
    let access = header(&response, "authorization").unwrap().to_string();

    let response = app.refresh(&access).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_service_outage_is_503() {
    let app = TestApp::spawn().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&app.trainer)
        .await;

    let response = app.login("a@x.com", "p1").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .send(
            axum::http::Request::builder()
                .uri("/health")
                .header("x-request-id", "req-1")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "x-request-id"), Some("req-1"));
    assert_eq!(header(&response, "x-content-type-options"), Some("nosniff"));

    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "auth-session-service-test");
}
