use chrono::{TimeDelta, Utc};
use secrecy::{ExposeSecret, Secret};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

use crate::models::AuthProvider;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub jwt: JwtConfig,
    pub session_store: SessionStoreConfig,
    pub profiles: ProfileServicesConfig,
    pub security: SecurityConfig,
    pub oauth: OAuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// `None` when the configured value does not fit a `TimeDelta`.
    pub fn access_ttl(&self) -> Option<TimeDelta> {
        TimeDelta::try_minutes(self.access_token_expiry_minutes)
    }

    pub fn refresh_ttl(&self) -> Option<TimeDelta> {
        TimeDelta::try_days(self.refresh_token_expiry_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub backend: SessionBackend,
    pub redis_url: String,
}

#[derive(Debug, Clone)]
pub struct ProfileServicesConfig {
    pub trainer_url: String,
    pub user_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Where the callback sends the browser once tokens are issued.
    pub frontend_url: String,
    pub providers: Vec<OAuthProviderConfig>,
}

#[derive(Debug, Clone)]
pub struct OAuthProviderConfig {
    pub provider: AuthProvider,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
}

impl OAuthProviderConfig {
    /// Registration with the provider's public endpoints filled in.
    pub fn with_defaults(
        provider: AuthProvider,
        client_id: String,
        client_secret: Secret<String>,
        redirect_uri: String,
    ) -> Self {
        let (authorize_url, token_url, userinfo_url, scope) = match provider {
            AuthProvider::Google => (
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                "https://openidconnect.googleapis.com/v1/userinfo",
                "openid email profile",
            ),
            AuthProvider::Github => (
                "https://github.com/login/oauth/authorize",
                "https://github.com/login/oauth/access_token",
                "https://api.github.com/user",
                "read:user user:email",
            ),
            AuthProvider::Kakao => (
                "https://kauth.kakao.com/oauth/authorize",
                "https://kauth.kakao.com/oauth/token",
                "https://kapi.kakao.com/v2/user/me",
                "profile_nickname profile_image account_email",
            ),
            AuthProvider::Naver => (
                "https://nid.naver.com/oauth2.0/authorize",
                "https://nid.naver.com/oauth2.0/token",
                "https://openapi.naver.com/v1/nid/me",
                "",
            ),
            AuthProvider::Local => ("", "", "", ""),
        };

        Self {
            provider,
            client_id,
            client_secret,
            redirect_uri,
            authorize_url: authorize_url.to_string(),
            token_url: token_url.to_string(),
            userinfo_url: userinfo_url.to_string(),
            scope: scope.to_string(),
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let backend: SessionBackend =
            parse_env("SESSION_STORE", Some(if is_prod { "redis" } else { "memory" }), is_prod)?;

        let config = AuthConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("auth-session-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            jwt: JwtConfig {
                secret: Secret::new(get_env("JWT_SECRET", None, is_prod)?),
                access_token_expiry_minutes: parse_env(
                    "JWT_ACCESS_TOKEN_EXPIRY_MINUTES",
                    Some("30"),
                    is_prod,
                )?,
                refresh_token_expiry_days: parse_env(
                    "JWT_REFRESH_TOKEN_EXPIRY_DAYS",
                    Some("14"),
                    is_prod,
                )?,
            },
            session_store: SessionStoreConfig {
                backend,
                redis_url: get_env(
                    "REDIS_URL",
                    Some("redis://127.0.0.1:6379"),
                    is_prod && backend == SessionBackend::Redis,
                )?,
            },
            profiles: ProfileServicesConfig {
                trainer_url: get_env("TRAINER_SERVICE_URL", Some("http://localhost:8082"), is_prod)?,
                user_url: get_env("USER_SERVICE_URL", Some("http://localhost:8081"), is_prod)?,
                request_timeout_ms: parse_env("PROFILE_REQUEST_TIMEOUT_MS", Some("5000"), is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            oauth: OAuthConfig {
                frontend_url: get_env(
                    "OAUTH_FRONTEND_URL",
                    Some("http://localhost:3000/oauth2/redirect"),
                    is_prod,
                )?,
                providers: oauth_providers_from_env()?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?,
                login_window_seconds: parse_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.secret.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must not be empty"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS must be positive"
            )));
        }

        let (Some(access_ttl), Some(refresh_ttl)) = (self.jwt.access_ttl(), self.jwt.refresh_ttl())
        else {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Token lifetimes are out of range"
            )));
        };

        if Utc::now().checked_add_signed(refresh_ttl).is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS is out of range"
            )));
        }

        if access_ttl >= refresh_ttl {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Access token lifetime must be shorter than refresh token lifetime"
            )));
        }

        if self.rate_limit.login_attempts == 0 || self.rate_limit.login_window_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RATE_LIMIT_LOGIN_ATTEMPTS and RATE_LIMIT_LOGIN_WINDOW_SECONDS must be positive"
            )));
        }

        if self.profiles.request_timeout_ms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PROFILE_REQUEST_TIMEOUT_MS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.session_store.backend == SessionBackend::Memory {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "In-memory session store cannot be shared across instances; use redis in production"
                )));
            }
        }

        Ok(())
    }
}

/// A provider is enabled when its client id is set.
fn oauth_providers_from_env() -> Result<Vec<OAuthProviderConfig>, AppError> {
    let mut providers = Vec::new();

    for provider in AuthProvider::FEDERATED {
        let prefix = format!("OAUTH_{}", provider.as_str().to_uppercase());
        let Some(client_id) = env::var(format!("{}_CLIENT_ID", prefix))
            .ok()
            .filter(|s| !s.is_empty())
        else {
            continue;
        };

        // Once enabled, the secret and redirect are required in every environment.
        let client_secret = get_env(&format!("{}_CLIENT_SECRET", prefix), None, true)?;
        let redirect_uri = get_env(&format!("{}_REDIRECT_URI", prefix), None, true)?;

        providers.push(OAuthProviderConfig::with_defaults(
            provider,
            client_id,
            Secret::new(client_secret),
            redirect_uri,
        ));
    }

    Ok(providers)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("{}: {}", key, e)))
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(SessionBackend::Redis),
            "memory" => Ok(SessionBackend::Memory),
            _ => Err(format!("Invalid session store: {}", s)),
        }
    }
}
