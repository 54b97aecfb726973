//! Wire records exchanged with the trainer and user profile services.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AuthProvider, Identity, Role};

/// Account record returned by `/login`, `/update` and `/signup`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub provider: Option<AuthProvider>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Argon2 PHC string, present only for local accounts.
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRecord")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("provider", &self.provider)
            .field("provider_id", &self.provider_id)
            .field("image_url", &self.image_url)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProfileRecord {
    /// A record without a provider belongs to a local (password) account.
    pub fn provider(&self) -> AuthProvider {
        self.provider.unwrap_or(AuthProvider::Local)
    }

    pub fn into_identity(self, default_role: Role) -> Identity {
        Identity {
            provider: self.provider(),
            role: self.role.unwrap_or(default_role),
            email: self.email,
            name: self.name,
            image_url: self.image_url,
        }
    }
}

/// `POST /login` body.
#[derive(Debug, Serialize)]
pub struct ProfileLookup<'a> {
    pub email: &'a str,
}

/// `POST /update` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// `POST /signup` body for a federated account.
#[derive(Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub provider: AuthProvider,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"email":"a@x.com","imageUrl":"http://img"}"#).unwrap();
        assert_eq!(record.provider(), AuthProvider::Local);

        let identity = record.into_identity(Role::Trainer);
        assert_eq!(identity.role, Role::Trainer);
        assert_eq!(identity.image_url.as_deref(), Some("http://img"));
    }

    #[test]
    fn test_debug_hides_password() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"email":"a@x.com","password":"$argon2id$secret"}"#)
                .unwrap();
        let printed = format!("{:?}", record);
        assert!(!printed.contains("secret"));
    }
}
