//! Normalization of OAuth provider user-info payloads.
//!
//! Every provider shapes its user-info response differently. Each one gets a
//! dedicated function producing the same [`FederatedProfile`].

use serde_json::Value;
use thiserror::Error;

use super::AuthProvider;

/// Provider-independent view of a federated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProfile {
    pub provider: AuthProvider,
    pub provider_user_id: String,
    pub email: String,
    pub display_name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FederatedProfileError {
    #[error("{0} did not return a user id")]
    MissingId(AuthProvider),

    #[error("{0} did not return an email address")]
    MissingEmail(AuthProvider),

    #[error("{0} reports the email address as unverified")]
    UnverifiedEmail(AuthProvider),

    #[error("{0} is not a federated provider")]
    NotFederated(AuthProvider),
}

impl FederatedProfile {
    pub fn from_user_info(
        provider: AuthProvider,
        payload: &Value,
    ) -> Result<Self, FederatedProfileError> {
        match provider {
            AuthProvider::Google => google(payload),
            AuthProvider::Github => github(payload),
            AuthProvider::Kakao => kakao(payload),
            AuthProvider::Naver => naver(payload),
            AuthProvider::Local => Err(FederatedProfileError::NotFederated(provider)),
        }
    }

    /// Placeholder credential sent on signup; federated accounts have no password.
    pub fn placeholder_credential(&self) -> String {
        format!("{}:{}", self.provider, self.provider_user_id)
    }
}

fn google(payload: &Value) -> Result<FederatedProfile, FederatedProfileError> {
    let provider = AuthProvider::Google;
    // v2 userinfo uses `verified_email`, the OIDC endpoint `email_verified`.
    let verified = payload
        .get("email_verified")
        .or_else(|| payload.get("verified_email"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
    if !verified {
        return Err(FederatedProfileError::UnverifiedEmail(provider));
    }

    let id = id_field(payload, "sub")
        .or_else(|| id_field(payload, "id"))
        .ok_or(FederatedProfileError::MissingId(provider))?;
    let email = str_field(payload, "email").ok_or(FederatedProfileError::MissingEmail(provider))?;

    Ok(FederatedProfile {
        provider,
        display_name: str_field(payload, "name").unwrap_or_else(|| local_part(&email)),
        image_url: str_field(payload, "picture"),
        provider_user_id: id,
        email,
    })
}

fn github(payload: &Value) -> Result<FederatedProfile, FederatedProfileError> {
    let provider = AuthProvider::Github;
    let id = id_field(payload, "id").ok_or(FederatedProfileError::MissingId(provider))?;
    let email = str_field(payload, "email").ok_or(FederatedProfileError::MissingEmail(provider))?;

    Ok(FederatedProfile {
        provider,
        display_name: str_field(payload, "name")
            .or_else(|| str_field(payload, "login"))
            .unwrap_or_else(|| local_part(&email)),
        image_url: str_field(payload, "avatar_url"),
        provider_user_id: id,
        email,
    })
}

fn kakao(payload: &Value) -> Result<FederatedProfile, FederatedProfileError> {
    let provider = AuthProvider::Kakao;
    let id = id_field(payload, "id").ok_or(FederatedProfileError::MissingId(provider))?;

    let account = payload.get("kakao_account").unwrap_or(&Value::Null);
    let email = str_field(account, "email").ok_or(FederatedProfileError::MissingEmail(provider))?;
    let profile = account.get("profile").unwrap_or(&Value::Null);
    let properties = payload.get("properties").unwrap_or(&Value::Null);

    Ok(FederatedProfile {
        provider,
        display_name: str_field(profile, "nickname")
            .or_else(|| str_field(properties, "nickname"))
            .unwrap_or_else(|| local_part(&email)),
        image_url: str_field(profile, "profile_image_url")
            .or_else(|| str_field(properties, "profile_image")),
        provider_user_id: id,
        email,
    })
}

fn naver(payload: &Value) -> Result<FederatedProfile, FederatedProfileError> {
    let provider = AuthProvider::Naver;
    let response = payload.get("response").unwrap_or(&Value::Null);
    let id = id_field(response, "id").ok_or(FederatedProfileError::MissingId(provider))?;
    let email =
        str_field(response, "email").ok_or(FederatedProfileError::MissingEmail(provider))?;

    Ok(FederatedProfile {
        provider,
        display_name: str_field(response, "name")
            .or_else(|| str_field(response, "nickname"))
            .unwrap_or_else(|| local_part(&email)),
        image_url: str_field(response, "profile_image"),
        provider_user_id: id,
        email,
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Ids arrive as strings from some providers and as numbers from others.
fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(_) => str_field(value, key),
        _ => None,
    }
}

fn local_part(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_google_payload() {
        let payload = json!({
            "sub": "1098",
            "email": "b@y.com",
            "email_verified": true,
            "name": "Bee",
            "picture": "https://img/b.png"
        });

        let profile = FederatedProfile::from_user_info(AuthProvider::Google, &payload).unwrap();
        assert_eq!(profile.provider_user_id, "1098");
        assert_eq!(profile.email, "b@y.com");
        assert_eq!(profile.display_name, "Bee");
        assert_eq!(profile.image_url.as_deref(), Some("https://img/b.png"));
        assert_eq!(profile.placeholder_credential(), "google:1098");
    }

    #[test]
    fn test_google_unverified_email_is_rejected() {
        let payload = json!({"id": "1", "email": "b@y.com", "verified_email": false});
        assert_eq!(
            FederatedProfile::from_user_info(AuthProvider::Google, &payload),
            Err(FederatedProfileError::UnverifiedEmail(AuthProvider::Google))
        );
    }

    #[test]
    fn test_github_numeric_id_and_login_fallback() {
        let payload = json!({
            "id": 583231,
            "login": "octocat",
            "name": null,
            "email": "octo@github.com",
            "avatar_url": "https://avatars/1"
        });

        let profile = FederatedProfile::from_user_info(AuthProvider::Github, &payload).unwrap();
        assert_eq!(profile.provider_user_id, "583231");
        assert_eq!(profile.display_name, "octocat");
    }

    #[test]
    fn test_github_private_email_is_missing() {
        let payload = json!({"id": 1, "login": "octocat", "email": null});
        assert_eq!(
            FederatedProfile::from_user_info(AuthProvider::Github, &payload),
            Err(FederatedProfileError::MissingEmail(AuthProvider::Github))
        );
    }

    #[test]
    fn test_kakao_nested_account() {
        let payload = json!({
            "id": 2401,
            "properties": {"nickname": "legacy", "profile_image": "http://old"},
            "kakao_account": {
                "email": "k@kakao.com",
                "profile": {"nickname": "Kay", "profile_image_url": "http://new"}
            }
        });

        let profile = FederatedProfile::from_user_info(AuthProvider::Kakao, &payload).unwrap();
        assert_eq!(profile.email, "k@kakao.com");
        assert_eq!(profile.display_name, "Kay");
        assert_eq!(profile.image_url.as_deref(), Some("http://new"));
    }

    #[test]
    fn test_naver_response_envelope() {
        let payload = json!({
            "resultcode": "00",
            "response": {"id": "nv-1", "email": "n@naver.com", "profile_image": "http://n"}
        });

        let profile = FederatedProfile::from_user_info(AuthProvider::Naver, &payload).unwrap();
        assert_eq!(profile.provider_user_id, "nv-1");
        assert_eq!(profile.display_name, "n");
    }

    #[test]
    fn test_local_is_not_federated() {
        assert_eq!(
            FederatedProfile::from_user_info(AuthProvider::Local, &json!({})),
            Err(FederatedProfileError::NotFederated(AuthProvider::Local))
        );
    }
}
