use service_core::{
    axum::{
        extract::State,
        http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
        response::{IntoResponse, Response},
        Json,
    },
    error::AppError,
};

use crate::{
    dtos::auth::{LoginRequest, LoginResponse, LogoutResponse, TokenRefreshResponse},
    utils::{Password, ValidatedJson},
    AppState,
};

pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Login with email and password.
///
/// Tokens are returned in the `Authorization` and `Refresh-token` headers.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    let tokens = state
        .auth
        .login(&req.email, &Password::new(req.password))
        .await?;

    let body = LoginResponse::new(tokens.access.expires_at(), tokens.refresh.expires_at());
    Ok((
        StatusCode::OK,
        [
            (header::AUTHORIZATION, bearer(&tokens.access.token)?),
            (
                HeaderName::from_static(REFRESH_TOKEN_HEADER),
                bearer(&tokens.refresh.token)?,
            ),
        ],
        Json(body),
    )
        .into_response())
}

/// Issue a new access token for the refresh token in the `Refresh-token` header.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let refresh_token = refresh_token_from(&headers)
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Missing refresh token")))?;

    let access = state.auth.refresh(&refresh_token).await?;

    Ok((
        StatusCode::OK,
        [(header::AUTHORIZATION, bearer(&access.token)?)],
        Json(TokenRefreshResponse::new(access.expires_at())),
    )
        .into_response())
}

/// Revoke the session behind the `Refresh-token` header. Always succeeds.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(refresh_token) = refresh_token_from(&headers) {
        state.auth.logout(&refresh_token).await;
    }

    Json(LogoutResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    })
}

/// Refresh token from its header; the `Bearer ` prefix is optional.
pub fn refresh_token_from(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(REFRESH_TOKEN_HEADER)?.to_str().ok()?.trim_start();
    let token = match raw.get(..6) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer") => {
            let rest = &raw[6..];
            // "Bearerxyz" is a bare token, not a scheme
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest
            } else {
                raw
            }
        }
        _ => raw,
    }
    .trim();

    (!token.is_empty()).then(|| token.to_string())
}

fn bearer(token: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Invalid token header: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REFRESH_TOKEN_HEADER, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_refresh_token_prefix_is_optional() {
        assert_eq!(refresh_token_from(&headers("Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(refresh_token_from(&headers("abc")).as_deref(), Some("abc"));
        assert_eq!(refresh_token_from(&headers("Bearer ")), None);
        assert_eq!(refresh_token_from(&headers("Bearer")), None);
        assert_eq!(refresh_token_from(&headers("Bearer   ")), None);
        assert_eq!(refresh_token_from(&headers("")), None);
    }

    #[test]
    fn test_refresh_token_scheme_is_case_insensitive() {
        assert_eq!(refresh_token_from(&headers("bearer abc")).as_deref(), Some("abc"));
        assert_eq!(refresh_token_from(&headers("BEARER  abc ")).as_deref(), Some("abc"));
        assert_eq!(refresh_token_from(&headers("  Bearer abc")).as_deref(), Some("abc"));
        assert_eq!(refresh_token_from(&headers("Bearerabc")).as_deref(), Some("Bearerabc"));
        assert_eq!(refresh_token_from(&HeaderMap::new()), None);
    }
}
