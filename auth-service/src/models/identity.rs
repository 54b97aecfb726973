//! Identity model - an account as seen by the token layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried in token claims and sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "USER", alias = "ROLE_USER")]
    User,
    #[serde(alias = "TRAINER", alias = "ROLE_TRAINER")]
    Trainer,
    #[serde(alias = "ADMIN", alias = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Trainer => "trainer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[serde(alias = "LOCAL")]
    Local,
    #[serde(alias = "GOOGLE")]
    Google,
    #[serde(alias = "GITHUB")]
    Github,
    #[serde(alias = "KAKAO")]
    Kakao,
    #[serde(alias = "NAVER")]
    Naver,
}

impl AuthProvider {
    /// Providers that can back a federated login.
    pub const FEDERATED: [AuthProvider; 4] = [
        AuthProvider::Google,
        AuthProvider::Github,
        AuthProvider::Kakao,
        AuthProvider::Naver,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
            AuthProvider::Kakao => "kakao",
            AuthProvider::Naver => "naver",
        }
    }

    pub fn is_federated(&self) -> bool {
        !matches!(self, AuthProvider::Local)
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(AuthProvider::Local),
            "google" => Ok(AuthProvider::Google),
            "github" => Ok(AuthProvider::Github),
            "kakao" => Ok(AuthProvider::Kakao),
            "naver" => Ok(AuthProvider::Naver),
            _ => Err(format!("Unknown auth provider: {}", s)),
        }
    }
}

/// A resolved account. The email is the stable identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub provider: AuthProvider,
    pub image_url: Option<String>,
}

impl Identity {
    pub fn key(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_accepts_prefixed_authorities() {
        let role: Role = serde_json::from_str("\"ROLE_TRAINER\"").unwrap();
        assert_eq!(role, Role::Trainer);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("GitHub".parse::<AuthProvider>(), Ok(AuthProvider::Github));
        assert!("myspace".parse::<AuthProvider>().is_err());
        let provider: AuthProvider = serde_json::from_str("\"GOOGLE\"").unwrap();
        assert_eq!(provider, AuthProvider::Google);
        assert!(!AuthProvider::Local.is_federated());
    }
}
