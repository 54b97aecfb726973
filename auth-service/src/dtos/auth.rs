use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Token values travel in headers; the body only reports expiries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token_expires_at: String,
    pub refresh_token_expires_at: String,
}

impl LoginResponse {
    pub fn new(access_expires_at: DateTime<Utc>, refresh_expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token_expires_at: access_expires_at.to_rfc2822(),
            refresh_token_expires_at: refresh_expires_at.to_rfc2822(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRefreshResponse {
    pub access_token_expires_at: String,
}

impl TokenRefreshResponse {
    pub fn new(access_expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token_expires_at: access_expires_at.to_rfc2822(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denies consent.
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use validator::Validate;

    #[test]
    fn test_login_request_validation() {
        let ok = LoginRequest {
            email: "a@x.com".to_string(),
            password: "p1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "not-an-email".to_string(),
            password: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_login_response_shape() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let body = serde_json::to_value(LoginResponse::new(at, at)).unwrap();
        let parsed = DateTime::parse_from_rfc2822(body["accessTokenExpiresAt"].as_str().unwrap()).unwrap();
        assert_eq!(parsed, at);
        assert!(body.get("refreshTokenExpiresAt").is_some());
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let req = LoginRequest {
            email: "a@x.com".to_string(),
            password: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", req).contains("hunter2"));
    }
}
