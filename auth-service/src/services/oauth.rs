//! Authorization-code flow with PKCE against the configured providers.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::observability::TracedClientExt;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::instrument;
use urlencoding::encode;

use super::AuthError;
use crate::config::OAuthProviderConfig;
use crate::models::{AuthProvider, FederatedProfile};

/// Redirect target plus the values the callback must see again.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub code_verifier: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub struct OAuthClient {
    providers: HashMap<AuthProvider, OAuthProviderConfig>,
    client: Client,
}

impl OAuthClient {
    pub fn new(providers: Vec<OAuthProviderConfig>, client: Client) -> Self {
        let providers: HashMap<_, _> = providers.into_iter().map(|p| (p.provider, p)).collect();
        let names: Vec<&str> = providers.keys().map(AuthProvider::as_str).collect();
        tracing::info!(providers = ?names, "OAuth providers configured");
        Self { providers, client }
    }

    pub fn is_configured(&self, provider: AuthProvider) -> bool {
        self.providers.contains_key(&provider)
    }

    /// `None` when the provider has no registration.
    pub fn authorization_request(&self, provider: AuthProvider) -> Option<AuthorizationRequest> {
        let config = self.providers.get(&provider)?;

        let state = uuid::Uuid::new_v4().to_string();
        let code_verifier = {
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill(&mut bytes);
            URL_SAFE_NO_PAD.encode(bytes)
        };
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()));

        let mut url = format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&state={}&code_challenge={}&code_challenge_method=S256",
            config.authorize_url,
            encode(&config.client_id),
            encode(&config.redirect_uri),
            encode(&state),
            code_challenge
        );
        if !config.scope.is_empty() {
            url.push_str("&scope=");
            url.push_str(&encode(&config.scope));
        }

        Some(AuthorizationRequest {
            url,
            state,
            code_verifier,
        })
    }

    /// Exchange the code and normalize the provider's user info.
    #[instrument(skip(self, code, code_verifier, state), fields(provider = %provider))]
    pub async fn fetch_profile(
        &self,
        provider: AuthProvider,
        code: &str,
        code_verifier: &str,
        state: &str,
    ) -> Result<FederatedProfile, AuthError> {
        let config = self
            .providers
            .get(&provider)
            .ok_or(AuthError::AuthenticationFailed)?;

        let access_token = self.exchange_code(config, code, code_verifier, state).await?;
        let user_info = self.fetch_user_info(config, &access_token).await?;

        FederatedProfile::from_user_info(provider, &user_info).map_err(|e| {
            tracing::warn!(error = %e, "Unusable user info from provider");
            AuthError::UpstreamDataError(e.to_string())
        })
    }

    async fn exchange_code(
        &self,
        config: &OAuthProviderConfig,
        code: &str,
        code_verifier: &str,
        state: &str,
    ) -> Result<String, AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose_secret().as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", config.redirect_uri.as_str()),
        ];
        // Naver validates the state again at the token endpoint.
        if config.provider == AuthProvider::Naver {
            form.push(("state", state));
        }

        let response = self
            .client
            .traced_post(&config.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to exchange authorization code");
                AuthError::UpstreamUnavailable(format!("{} token endpoint unreachable", config.provider))
            })?;

        let status = response.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "Token endpoint failed");
            return Err(AuthError::UpstreamUnavailable(format!(
                "{} token endpoint returned {}",
                config.provider, status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Token exchange rejected");
            return Err(AuthError::AuthenticationFailed);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse token response");
            AuthError::UpstreamDataError(format!("{} token response is malformed", config.provider))
        })?;

        Ok(token.access_token)
    }

    async fn fetch_user_info(
        &self,
        config: &OAuthProviderConfig,
        access_token: &str,
    ) -> Result<serde_json::Value, AuthError> {
        let response = self
            .client
            .traced_get(&config.userinfo_url)
            .header("Accept", "application/json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch user info");
                AuthError::UpstreamUnavailable(format!("{} user info unreachable", config.provider))
            })?;

        let status = response.status();
        if status.is_server_error() {
            tracing::error!(status = %status, "User info endpoint failed");
            return Err(AuthError::UpstreamUnavailable(format!(
                "{} user info returned {}",
                config.provider, status
            )));
        }
        if !status.is_success() {
            tracing::error!(status = %status, "User info request rejected");
            return Err(AuthError::AuthenticationFailed);
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse user info");
            AuthError::UpstreamDataError(format!("{} user info is malformed", config.provider))
        })
    }
}
