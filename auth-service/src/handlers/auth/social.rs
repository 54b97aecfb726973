use axum_extra::extract::cookie::{Cookie, CookieJar};
use service_core::{
    axum::{
        extract::{Path, Query, State},
        response::{IntoResponse, Redirect, Response},
    },
    error::AppError,
};
use urlencoding::encode;

use crate::{dtos::auth::OAuthCallbackQuery, models::AuthProvider, AppState};

const STATE_COOKIE: &str = "oauth_state";
const VERIFIER_COOKIE: &str = "code_verifier";

fn provider_from_path(state: &AppState, provider: &str) -> Result<AuthProvider, AppError> {
    provider
        .parse::<AuthProvider>()
        .ok()
        .filter(|p| p.is_federated() && state.oauth.is_configured(*p))
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Unknown OAuth provider: {}", provider)))
}

fn flow_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::minutes(5))
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Start the authorization-code flow; state and PKCE verifier ride in cookies.
pub async fn oauth_authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), AppError> {
    let provider = provider_from_path(&state, &provider)?;
    let request = state
        .oauth
        .authorization_request(provider)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Unknown OAuth provider")))?;

    let jar = jar
        .add(flow_cookie(STATE_COOKIE, request.state))
        .add(flow_cookie(VERIFIER_COOKIE, request.code_verifier));

    Ok((jar, Redirect::to(&request.url).into_response()))
}

/// Finish the flow and hand the tokens to the frontend.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<(CookieJar, Response), AppError> {
    let provider = provider_from_path(&state, &provider)?;

    if let Some(error) = query.error {
        tracing::warn!(provider = %provider, error = %error, "Provider returned an error");
        return Err(AppError::AuthError(anyhow::anyhow!("Authorization was not granted")));
    }

    // 1. Validate state
    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if stored_state.is_none() || stored_state != query.state {
        return Err(AppError::BadRequest(anyhow::anyhow!("Invalid OAuth state")));
    }

    // 2. Get code verifier
    let code_verifier = jar
        .get(VERIFIER_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing code verifier")))?;
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing authorization code")))?;

    // 3. Exchange the code and normalize the provider profile
    let profile = state
        .oauth
        .fetch_profile(provider, &code, &code_verifier, stored_state.as_deref().unwrap_or_default())
        .await?;

    // 4. Resolve the identity and open a session
    let tokens = state.auth.login_federated(&profile).await?;

    let frontend = &state.config.oauth.frontend_url;
    let separator = if frontend.contains('?') { '&' } else { '?' };
    let target = format!(
        "{}{}access_token={}&refresh_token={}",
        frontend,
        separator,
        encode(&tokens.access.token),
        encode(&tokens.refresh.token)
    );

    let jar = jar
        .remove(expired_cookie(STATE_COOKIE))
        .remove(expired_cookie(VERIFIER_COOKIE));

    Ok((jar, Redirect::to(&target).into_response()))
}
