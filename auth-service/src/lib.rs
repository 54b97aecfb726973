pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AuthConfig;
use crate::dtos::HealthResponse;
use crate::handlers::auth::session::REFRESH_TOKEN_HEADER;
use crate::services::{
    build_http_client, AuthSessionService, HttpProfileService, IdentityResolver, OAuthClient,
    ProfileCredentialVerifier, ProfileService, SessionStore, TokenCodec,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub auth: AuthSessionService,
    pub oauth: Arc<OAuthClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub login_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services around an already opened session store.
    pub fn build(config: AuthConfig, sessions: Arc<dyn SessionStore>) -> Result<Self, AppError> {
        let client = build_http_client(Duration::from_millis(config.profiles.request_timeout_ms))
            .map_err(AppError::ConfigError)?;

        let trainer: Arc<dyn ProfileService> = Arc::new(HttpProfileService::new(
            "trainer",
            &config.profiles.trainer_url,
            client.clone(),
        ));
        let user: Arc<dyn ProfileService> = Arc::new(HttpProfileService::new(
            "user",
            &config.profiles.user_url,
            client.clone(),
        ));

        let tokens = TokenCodec::from_config(&config.jwt).map_err(AppError::ConfigError)?;
        let auth = AuthSessionService::new(
            tokens,
            sessions.clone(),
            Arc::new(ProfileCredentialVerifier::new(trainer.clone(), user.clone())),
            IdentityResolver::new(trainer, user),
        );
        let oauth = Arc::new(OAuthClient::new(config.oauth.providers.clone(), client));

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );

        Ok(Self {
            config,
            auth,
            oauth,
            sessions,
            login_rate_limiter,
        })
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Create login route with rate limiting
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/login", post(handlers::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let allowed_origins = state
        .config
        .security
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let refresh_header = HeaderName::from_static(REFRESH_TOKEN_HEADER);

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(login_route)
        .route("/token", get(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/oauth2/authorize/:provider", get(handlers::oauth_authorize))
        .route("/oauth2/callback/:provider", get(handlers::oauth_callback))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, refresh_header.clone()])
                .expose_headers([header::AUTHORIZATION, refresh_header]),
        );

    Ok(app)
}

/// Service health check; fails when the session store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.sessions.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Session store health check failed");
        AppError::ServiceUnavailable("session store".to_string())
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        service: state.config.service_name.clone(),
        version: state.config.service_version.clone(),
    }))
}
