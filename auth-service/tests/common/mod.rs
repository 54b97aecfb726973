//! Shared harness: the router over an in-memory session store, with the
//! profile services and an OAuth provider stubbed by wiremock.

#![allow(dead_code)]

use auth_session_service::{
    build_router,
    config::{
        AuthConfig, Environment, JwtConfig, OAuthConfig, OAuthProviderConfig,
        ProfileServicesConfig, RateLimitConfig, SecurityConfig, SessionBackend,
        SessionStoreConfig,
    },
    models::AuthProvider,
    services::InMemorySessionStore,
    utils::{hash_password, Password},
    AppState,
};
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";
pub const FRONTEND_URL: &str = "http://frontend.test/oauth2/redirect";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub sessions: Arc<InMemorySessionStore>,
    pub trainer: MockServer,
    pub user: MockServer,
    pub provider: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let trainer = MockServer::start().await;
        let user = MockServer::start().await;
        let provider = MockServer::start().await;

        let config = test_config(&trainer, &user, &provider);
        let sessions = Arc::new(InMemorySessionStore::new());
        let state =
            AppState::build(config, sessions.clone()).expect("Failed to build application state");
        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        Self {
            router,
            state,
            sessions,
            trainer,
            user,
            provider,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to respond")
    }

    pub async fn login(&self, email: &str, password: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({"email": email, "password": password}).to_string(),
                ))
                .unwrap(),
        )
        .await
    }

    pub async fn refresh(&self, refresh_header: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("GET")
                .uri("/token")
                .header("Refresh-token", refresh_header)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn logout(&self, refresh_header: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header("Refresh-token", refresh_header)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Local account known to the user service only.
    pub async fn given_local_user(&self, email: &str, password: &str) {
        given_not_found(&self.trainer).await;
        let hash = hash_password(&Password::new(password.to_string())).unwrap();
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"email": email})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": email,
                "name": "Test User",
                "role": "USER",
                "provider": "LOCAL",
                "password": hash.as_str()
            })))
            .mount(&self.user)
            .await;
    }
}

pub async fn given_not_found(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

pub fn test_config(trainer: &MockServer, user: &MockServer, provider: &MockServer) -> AuthConfig {
    AuthConfig {
        common: service_core::config::Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "auth-session-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        jwt: JwtConfig {
            secret: Secret::new(TEST_JWT_SECRET.to_string()),
            access_token_expiry_minutes: 30,
            refresh_token_expiry_days: 14,
        },
        session_store: SessionStoreConfig {
            backend: SessionBackend::Memory,
            redis_url: String::new(),
        },
        profiles: ProfileServicesConfig {
            trainer_url: trainer.uri(),
            user_url: user.uri(),
            request_timeout_ms: 1000,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://frontend.test".to_string()],
        },
        oauth: OAuthConfig {
            frontend_url: FRONTEND_URL.to_string(),
            providers: vec![OAuthProviderConfig {
                provider: AuthProvider::Google,
                client_id: "google-client".to_string(),
                client_secret: Secret::new("google-secret".to_string()),
                redirect_uri: "http://localhost:8080/oauth2/callback/google".to_string(),
                authorize_url: format!("{}/authorize", provider.uri()),
                token_url: format!("{}/token", provider.uri()),
                userinfo_url: format!("{}/userinfo", provider.uri()),
                scope: "openid email profile".to_string(),
            }],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
        },
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
